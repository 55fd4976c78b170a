use crate::domain_model::{CommandKind, StorageKind};

/// External operation names for one backend flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationTable {
    pub get: &'static str,
    pub set: &'static str,
    pub delete: &'static str,
    pub clear: &'static str,
    pub listen: &'static str,
}

pub const LOCAL_OPERATIONS: OperationTable = OperationTable {
    get: "storeLocally.get",
    set: "storeLocally.set",
    delete: "storeLocally.delete",
    clear: "storeLocally.clear",
    listen: "storeLocally.eventListener",
};

pub const COOKIE_OPERATIONS: OperationTable = OperationTable {
    get: "cookieStorage.get",
    set: "cookieStorage.set",
    delete: "cookieStorage.delete",
    clear: "cookieStorage.clear",
    listen: "cookieStorage.eventListener",
};

impl OperationTable {
    /// `None` for kinds that are not served by an external channel.
    pub fn for_kind(kind: StorageKind) -> Option<&'static OperationTable> {
        match kind {
            StorageKind::Cookies => Some(&COOKIE_OPERATIONS),
            StorageKind::Local => Some(&LOCAL_OPERATIONS),
            StorageKind::Memory | StorageKind::Session => None,
        }
    }

    pub fn operation(&self, command: CommandKind) -> &'static str {
        match command {
            CommandKind::Get => self.get,
            CommandKind::Set => self.set,
            CommandKind::Delete => self.delete,
            CommandKind::Clear => self.clear,
            CommandKind::Listen => self.listen,
        }
    }
}

/// The verb after the flavour prefix, e.g. `get` for `cookieStorage.get`.
pub fn operation_verb(operation: &str) -> &str {
    operation
        .rsplit_once('.')
        .map(|(_, verb)| verb)
        .unwrap_or(operation)
}
