//! Resource and action names used in permission grants.
//!
//! Both are open enumerations: any lowercase identifier is accepted, so a
//! company can grant on resources this crate has never heard of. The
//! constants below are the ones default role templates are built from.

use validator::ValidationError;

const MAX_NAME_LEN: usize = 64;

fn check_name(kind: &'static str, raw: &str) -> Result<String, ValidationError> {
    let ok = !raw.is_empty()
        && raw.len() <= MAX_NAME_LEN
        && raw.starts_with(|c: char| c.is_ascii_lowercase())
        && raw.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if ok {
        Ok(raw.to_string())
    } else {
        let mut error = ValidationError::new(kind);
        error.message = Some(format!("{kind} must be a lowercase identifier of at most {MAX_NAME_LEN} characters").into());
        Err(error)
    }
}

/// A resource a grant applies to (e.g. `vehicles`, `settings`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct ResourceName(String);

impl ResourceName {
    pub const USERS: &'static str = "users";
    pub const VEHICLES: &'static str = "vehicles";
    pub const EQUIPMENT: &'static str = "equipment";
    pub const MAINTENANCE: &'static str = "maintenance";
    pub const WORK_ORDERS: &'static str = "work_orders";
    pub const PARTS_INVENTORY: &'static str = "parts_inventory";
    pub const REPORTS: &'static str = "reports";
    pub const SETTINGS: &'static str = "settings";

    /// Resources every new company gets default grants for.
    pub const DEFAULTS: &'static [&'static str] = &[
        Self::USERS,
        Self::VEHICLES,
        Self::EQUIPMENT,
        Self::MAINTENANCE,
        Self::WORK_ORDERS,
        Self::PARTS_INVENTORY,
        Self::REPORTS,
        Self::SETTINGS,
    ];

    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        check_name("resource", raw.as_ref()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An action on a resource (e.g. `view`, `delete`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct ActionName(String);

impl ActionName {
    pub const VIEW: &'static str = "view";
    pub const CREATE: &'static str = "create";
    pub const EDIT: &'static str = "edit";
    pub const DELETE: &'static str = "delete";

    pub const DEFAULTS: &'static [&'static str] = &[Self::VIEW, Self::CREATE, Self::EDIT, Self::DELETE];

    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        check_name("action", raw.as_ref()).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
