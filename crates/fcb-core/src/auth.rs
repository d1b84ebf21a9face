use fcb_schemas::{BrokerError, BrokerOperation, OperationKind, SystemUser};
use std::collections::HashSet;

/// Authorization seam consulted before every facade operation.
///
/// The engine enforces ownership itself (a hard invariant); this trait only
/// answers the policy question "may this principal perform this kind of
/// operation". Implementations rule on the operation descriptor, never on
/// order internals.
pub trait AuthorizationPlugin: Send + Sync {
    fn is_authorized(
        &self,
        user: &SystemUser,
        operation: &BrokerOperation,
    ) -> Result<(), BrokerError>;
}

/// Grants everything. The default for development deployments.
pub struct AllowAllPlugin;

impl AuthorizationPlugin for AllowAllPlugin {
    fn is_authorized(
        &self,
        _user: &SystemUser,
        _operation: &BrokerOperation,
    ) -> Result<(), BrokerError> {
        Ok(())
    }
}

/// Grants everything except the listed operation kinds.
pub struct AllowAllExceptPlugin {
    denied: HashSet<OperationKind>,
}

impl AllowAllExceptPlugin {
    pub fn new(denied: impl IntoIterator<Item = OperationKind>) -> Self {
        Self {
            denied: denied.into_iter().collect(),
        }
    }
}

impl AuthorizationPlugin for AllowAllExceptPlugin {
    fn is_authorized(
        &self,
        user: &SystemUser,
        operation: &BrokerOperation,
    ) -> Result<(), BrokerError> {
        if self.denied.contains(&operation.kind) {
            return Err(BrokerError::Unauthorized(format!(
                "operation {} is not permitted for user {}",
                operation.kind, user.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcb_schemas::{MemberId, ResourceType};

    #[test]
    fn allow_all_except_denies_only_listed_kinds() {
        let plugin = AllowAllExceptPlugin::new([OperationKind::Delete]);
        let user = SystemUser::new("u1", "u1", MemberId::from("m"));

        let delete = BrokerOperation::new(OperationKind::Delete, ResourceType::Compute);
        assert!(matches!(
            plugin.is_authorized(&user, &delete),
            Err(BrokerError::Unauthorized(_))
        ));

        let create = BrokerOperation::new(OperationKind::Create, ResourceType::Compute);
        assert!(plugin.is_authorized(&user, &create).is_ok());
    }
}
