mod claim;
mod identity;
mod identity_options;
mod login_credential;
mod storage_command;
mod storage_options;

pub use claim::*;
pub use identity::*;
pub use identity_options::*;
pub use login_credential::*;
pub use storage_command::*;
pub use storage_options::*;
