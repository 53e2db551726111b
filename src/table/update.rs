/// New state given either directly or as a function of the previous state.
pub enum StateUpdate<V> {
    Value(V),
    Update(Box<dyn FnOnce(&V) -> V>),
}

impl<V> StateUpdate<V> {
    pub fn update(f: impl FnOnce(&V) -> V + 'static) -> Self {
        StateUpdate::Update(Box::new(f))
    }

    pub fn apply(self, previous: &V) -> V {
        match self {
            StateUpdate::Value(value) => value,
            StateUpdate::Update(f) => f(previous),
        }
    }
}

impl<V> From<V> for StateUpdate<V> {
    fn from(value: V) -> Self {
        StateUpdate::Value(value)
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for StateUpdate<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateUpdate::Value(v) => f.debug_tuple("Value").field(v).finish(),
            StateUpdate::Update(_) => f.write_str("Update(..)"),
        }
    }
}
