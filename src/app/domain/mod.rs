pub mod company_id;
pub mod email;
pub mod password;
pub mod permission;
pub mod role;
pub mod user_id;

pub use company_id::CompanyId;
pub use email::Email;
pub use password::{HashedPassword, Password};
pub use permission::{ActionName, ResourceName};
pub use role::Role;
pub use user_id::UserId;
