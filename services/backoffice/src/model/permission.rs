//! Permission catalog and role labels.
//!
//! Both sets are closed and static. The declaration order below is the
//! catalog order used when permissions are stored or listed.
use std::collections::BTreeSet;

closed_set! {
    /// Permission token granted to a role, rendered as `resource.action`.
    Permission ("permission") {
        UsersView => "users.view",
        UsersCreate => "users.create",
        UsersEdit => "users.edit",
        UsersDelete => "users.delete",
        RolesView => "roles.view",
        RolesCreate => "roles.create",
        RolesEdit => "roles.edit",
        RolesDelete => "roles.delete",
        EnquiriesView => "enquiries.view",
        EnquiriesCreate => "enquiries.create",
        EnquiriesEdit => "enquiries.edit",
        EnquiriesDelete => "enquiries.delete",
        ProfileMappingsView => "profile_mappings.view",
        ProfileMappingsCreate => "profile_mappings.create",
        ProfileMappingsEdit => "profile_mappings.edit",
        ProfileMappingsDelete => "profile_mappings.delete",
        ProjectsManage => "projects.manage",
        ProductsManage => "products.manage",
        AmcManage => "amc.manage",
        ComplaintsManage => "complaints.manage",
        InfoManage => "info.manage",
        JobsManage => "jobs.manage",
        SiteVisitsManage => "site_visits.manage",
        ReportsView => "reports.view",
        SettingsManage => "settings.manage",
    }
}

closed_set! {
    /// Role label; each label may be held by at most one role record.
    RoleName ("role name") {
        Admin => "Admin",
        Manager => "Manager",
        SalesExecutive => "Sales Executive",
        ServiceEngineer => "Service Engineer",
        Accountant => "Accountant",
        Support => "Support",
        Viewer => "Viewer",
    }
}

impl RoleName {
    /// Permissions a new role receives when the caller supplies none.
    pub fn default_permissions(self) -> Vec<Permission> {
        match self {
            RoleName::Admin => Permission::ALL.to_vec(),
            _ => Vec::new(),
        }
    }
}

/// Deduplicate and put permissions into catalog order.
pub fn normalize_permissions(permissions: impl IntoIterator<Item = Permission>) -> Vec<Permission> {
    permissions
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
