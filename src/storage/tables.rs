use redb::TableDefinition;

/// Client state: storage key -> JSON document (UTF-8 bytes)
pub const CLIENT_STATE: TableDefinition<&str, &[u8]> = TableDefinition::new("client_state");
