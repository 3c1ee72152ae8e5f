//! Test fixtures backed by an in-memory sqlite database

use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use std::sync::atomic::{AtomicI64, Ordering};

use crate::config::BootstrapConfig;
use crate::db;
use crate::entity::{menu, role, role_menu, tenant, user, user_role};
use crate::password::PasswordHasher;

pub const PASSWORD: &str = "secret123";

pub fn hasher() -> PasswordHasher {
    PasswordHasher::new(4)
}

/// Fresh schema, no rows
pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db::auto_migrate(&db).await.unwrap();
    db
}

/// Schema plus the system tenant, the `admin` account and the default menus
pub async fn setup_seeded_db() -> DatabaseConnection {
    let db = setup_db().await;
    db::seed_defaults(&db, &BootstrapConfig::default(), hasher()).await.unwrap();
    db
}

pub struct TestData<'a> {
    db: &'a DatabaseConnection,
    seq: AtomicI64,
}

impl<'a> TestData<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db, seq: AtomicI64::new(0) }
    }

    fn next(&self) -> i64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    pub async fn tenant(&self, code: &str) -> tenant::Model {
        self.tenant_on(code, "").await
    }

    /// Tenant reachable through the given host name
    pub async fn tenant_on(&self, code: &str, domain: &str) -> tenant::Model {
        tenant::ActiveModel {
            code: Set(code.to_string()),
            name: Set(format!("{} inc", code)),
            domain: Set(domain.to_string()),
            status: Set(tenant::TenantStatus::Normal.into()),
            max_users: Set(100),
            storage_limit: Set(0),
            expire_at: Set(None),
            admin_user_id: Set(0),
            config: Set("{}".to_string()),
            remark: Set(String::new()),
            created_at: Set(Self::now()),
            updated_at: Set(Self::now()),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(self.db)
        .await
        .unwrap()
    }

    pub async fn menu(&self, parent_id: i64, menu_type: i32, permission: &str) -> menu::Model {
        let n = self.next();
        let path = if menu_type == 3 { String::new() } else { format!("/m{}", n) };
        menu::ActiveModel {
            parent_id: Set(parent_id),
            title: Set(format!("Menu {}", n)),
            name: Set(format!("menu_{}", n)),
            path: Set(path),
            component: Set(String::new()),
            icon: Set(String::new()),
            menu_type: Set(menu_type),
            sort: Set(n as i32),
            status: Set(menu::STATUS_ENABLED),
            visible: Set(1),
            permission: Set(permission.to_string()),
            redirect: Set(String::new()),
            always_show: Set(0),
            breadcrumb: Set(1),
            active_menu: Set(String::new()),
            remark: Set(String::new()),
            created_at: Set(Self::now()),
            updated_at: Set(Self::now()),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(self.db)
        .await
        .unwrap()
    }

    pub async fn set_menu_status(&self, id: i64, status: i32) {
        let mut active: menu::ActiveModel = Default::default();
        active.id = sea_orm::Unchanged(id);
        active.status = Set(status);
        active.update(self.db).await.unwrap();
    }

    pub async fn soft_delete_menu(&self, id: i64) {
        let mut active: menu::ActiveModel = Default::default();
        active.id = sea_orm::Unchanged(id);
        active.deleted_at = Set(Some(Self::now()));
        active.update(self.db).await.unwrap();
    }

    pub async fn role(&self, tenant_id: i64, code: &str, data_scope: i32) -> role::Model {
        role::ActiveModel {
            tenant_id: Set(tenant_id),
            name: Set(format!("Role {}", code)),
            code: Set(code.to_string()),
            description: Set(String::new()),
            status: Set(role::STATUS_ENABLED),
            sort: Set(0),
            data_scope: Set(data_scope),
            remark: Set(String::new()),
            created_by: Set(0),
            created_at: Set(Self::now()),
            updated_at: Set(Self::now()),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(self.db)
        .await
        .unwrap()
    }

    pub async fn bind_menus(&self, tenant_id: i64, role_id: i64, menu_ids: &[i64]) {
        for menu_id in menu_ids {
            role_menu::ActiveModel {
                tenant_id: Set(tenant_id),
                role_id: Set(role_id),
                menu_id: Set(*menu_id),
                created_at: Set(Self::now()),
                ..Default::default()
            }
            .insert(self.db)
            .await
            .unwrap();
        }
    }

    /// Active user whose password is [`PASSWORD`]
    pub async fn user(&self, tenant_id: i64, username: &str) -> user::Model {
        user::ActiveModel {
            tenant_id: Set(tenant_id),
            username: Set(username.to_string()),
            password: Set(hasher().hash(PASSWORD).unwrap()),
            real_name: Set(username.to_uppercase()),
            email: Set(String::new()),
            phone: Set(String::new()),
            avatar: Set(String::new()),
            dept_id: Set(0),
            status: Set(user::UserStatus::Normal.into()),
            login_ip: Set(String::new()),
            login_at: Set(None),
            login_count: Set(0),
            remark: Set(String::new()),
            created_by: Set(0),
            created_at: Set(Self::now()),
            updated_at: Set(Self::now()),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(self.db)
        .await
        .unwrap()
    }

    pub async fn assign(&self, tenant_id: i64, user_id: i64, role_id: i64, primary: bool) -> user_role::Model {
        self.insert_assignment(tenant_id, user_id, role_id, primary, None).await
    }

    pub async fn assign_until(
        &self,
        tenant_id: i64,
        user_id: i64,
        role_id: i64,
        expires_at: Option<i64>,
    ) -> user_role::Model {
        self.insert_assignment(tenant_id, user_id, role_id, true, expires_at).await
    }

    async fn insert_assignment(
        &self,
        tenant_id: i64,
        user_id: i64,
        role_id: i64,
        primary: bool,
        expires_at: Option<i64>,
    ) -> user_role::Model {
        user_role::ActiveModel {
            tenant_id: Set(tenant_id),
            user_id: Set(user_id),
            role_id: Set(role_id),
            is_primary: Set(i32::from(primary)),
            assigned_by: Set(0),
            expires_at: Set(expires_at),
            created_at: Set(Self::now()),
            ..Default::default()
        }
        .insert(self.db)
        .await
        .unwrap()
    }
}
