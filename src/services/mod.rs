pub mod inventory;
pub mod order_number;
pub mod orders;
pub mod products;
pub mod restock;

use crate::entities::Role;
use crate::errors::ServiceError;
use uuid::Uuid;

/// Identity a service call is performed on behalf of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Admins and managers run the back office
    pub fn is_staff(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Manager)
    }

    pub fn require_staff(&self) -> Result<(), ServiceError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "Admin or manager role required".to_string(),
            ))
        }
    }

    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("Admin role required".to_string()))
        }
    }

    pub fn require_customer(&self) -> Result<(), ServiceError> {
        if self.role == Role::Customer {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("Customer role required".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn role_gates() {
        let admin = Actor::new(Uuid::new_v4(), Role::Admin);
        let manager = Actor::new(Uuid::new_v4(), Role::Manager);
        let customer = Actor::new(Uuid::new_v4(), Role::Customer);

        assert!(admin.require_staff().is_ok());
        assert!(manager.require_staff().is_ok());
        assert_matches!(customer.require_staff(), Err(ServiceError::Forbidden(_)));

        assert!(admin.require_admin().is_ok());
        assert_matches!(manager.require_admin(), Err(ServiceError::Forbidden(_)));

        assert!(customer.require_customer().is_ok());
        assert_matches!(admin.require_customer(), Err(ServiceError::Forbidden(_)));
    }
}
