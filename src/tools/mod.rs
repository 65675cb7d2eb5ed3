pub mod arxml;
pub mod can;
pub mod export;
pub mod nvm;
pub mod os;
pub mod registry;
pub mod validate;

pub use can::CanConfigTool;
pub use export::ExportArxmlTool;
pub use nvm::NvmConfigTool;
pub use os::OsConfigTool;
pub use validate::ValidateConfigTool;
