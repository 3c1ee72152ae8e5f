use sea_orm::sea_query::TableCreateStatement;
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, Schema, Set, TransactionTrait,
};
use std::time::Duration;
use tracing::info;

use crate::config::{BootstrapConfig, DatabaseConfig};
use crate::entity::{menu, op_log, role, role_menu, tenant, user, user_role};
use crate::error::AppResult;
use crate::password::PasswordHasher;
use crate::permission::{data_scope, role_code};

/// Default menu tree: (menu name, title, list permission, button permissions)
const DEFAULT_MENUS: &[(&str, &str, &str, &[&str])] = &[
    (
        "user",
        "Users",
        "user:list",
        &[
            "user:detail",
            "user:create",
            "user:update",
            "user:status",
            "user:delete",
            "user:roles",
            "user:roles:assign",
            "user:roles:remove",
            "user:roles:primary",
        ],
    ),
    (
        "role",
        "Roles",
        "role:list",
        &[
            "role:detail",
            "role:create",
            "role:update",
            "role:delete",
            "role:batch-delete",
            "role:status",
            "role:copy",
            "role:menus",
            "role:menus:update",
            "role:permissions",
            "role:options",
            "role:stats",
            "role:data-scopes",
            "role:check-users",
            "role:filter-users",
        ],
    ),
    (
        "menu",
        "Menus",
        "menu:list",
        &[
            "menu:tree",
            "menu:detail",
            "menu:create",
            "menu:update",
            "menu:delete",
            "menu:batch-delete",
            "menu:status",
            "menu:options",
            "menu:routers",
        ],
    ),
    (
        "tenant",
        "Tenants",
        "tenant:list",
        &[
            "tenant:detail",
            "tenant:create",
            "tenant:update",
            "tenant:delete",
            "tenant:status",
            "tenant:stats",
            "tenant:config",
            "tenant:options",
            "tenant:by-code",
        ],
    ),
    ("oplog", "Operation Log", "oplog:query", &["oplog:delete"]),
];

/// Initialize database connection and auto-migrate tables
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let database_url = config.connection_url();

    match &config.url {
        Some(_) => info!("Connecting to database from configured url"),
        None => info!("Connecting to database: {}:{}/{}", config.host, config.port, config.name),
    }

    let mut opt = ConnectOptions::new(&database_url);
    opt.max_connections(config.max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;
    info!("Database connection established");

    auto_migrate(&db).await?;

    Ok(db)
}

/// Create every table that does not exist yet
pub async fn auto_migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    create_table_if_not_exists(db, schema.create_table_from_entity(tenant::Entity)).await?;
    create_table_if_not_exists(db, schema.create_table_from_entity(user::Entity)).await?;
    create_table_if_not_exists(db, schema.create_table_from_entity(role::Entity)).await?;
    create_table_if_not_exists(db, schema.create_table_from_entity(menu::Entity)).await?;
    create_table_if_not_exists(db, schema.create_table_from_entity(role_menu::Entity)).await?;
    create_table_if_not_exists(db, schema.create_table_from_entity(user_role::Entity)).await?;
    create_table_if_not_exists(db, schema.create_table_from_entity(op_log::Entity)).await?;

    info!("Database migration completed");
    Ok(())
}

async fn create_table_if_not_exists(db: &DatabaseConnection, mut stmt: TableCreateStatement) -> Result<(), DbErr> {
    stmt.if_not_exists();
    let backend = db.get_database_backend();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

/// Populate an empty database with the system tenant, its administrator and the default menus.
///
/// Returns `false` when tenants already exist.
pub async fn seed_defaults(
    db: &DatabaseConnection,
    bootstrap: &BootstrapConfig,
    hasher: PasswordHasher,
) -> AppResult<bool> {
    if tenant::Entity::find().count(db).await? > 0 {
        return Ok(false);
    }

    let now = chrono::Utc::now().timestamp();
    let password = hasher.hash(&bootstrap.admin_password)?;
    let txn = db.begin().await?;

    let system = tenant::ActiveModel {
        code: Set(tenant::SYSTEM_TENANT_CODE.to_string()),
        name: Set("System".to_string()),
        domain: Set(String::new()),
        status: Set(tenant::TenantStatus::Normal.into()),
        max_users: Set(10_000),
        storage_limit: Set(0),
        expire_at: Set(None),
        admin_user_id: Set(0),
        config: Set("{}".to_string()),
        remark: Set("built-in system tenant".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let admin_role = role::ActiveModel {
        tenant_id: Set(system.id),
        name: Set("Super Administrator".to_string()),
        code: Set(role_code::SUPER_ADMIN.to_string()),
        description: Set("full access to every tenant".to_string()),
        status: Set(role::STATUS_ENABLED),
        sort: Set(0),
        data_scope: Set(data_scope::ALL),
        remark: Set(String::new()),
        created_by: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let admin = user::ActiveModel {
        tenant_id: Set(system.id),
        username: Set(bootstrap.admin_username.clone()),
        password: Set(password),
        real_name: Set("System Administrator".to_string()),
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
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    user_role::ActiveModel {
        tenant_id: Set(system.id),
        user_id: Set(admin.id),
        role_id: Set(admin_role.id),
        is_primary: Set(1),
        assigned_by: Set(0),
        expires_at: Set(None),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let menu_ids = seed_menus(&txn, now).await?;
    for menu_id in &menu_ids {
        role_menu::ActiveModel {
            tenant_id: Set(system.id),
            role_id: Set(admin_role.id),
            menu_id: Set(*menu_id),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    let mut system: tenant::ActiveModel = system.into();
    system.admin_user_id = Set(admin.id);
    let system = system.update(&txn).await?;

    txn.commit().await?;

    if system.id != tenant::SYSTEM_TENANT_ID {
        tracing::warn!(
            "System tenant was created with id {}, set tenant.default_tenant_id accordingly",
            system.id
        );
    }
    info!(
        "Seeded system tenant, administrator '{}' and {} menus",
        bootstrap.admin_username,
        menu_ids.len()
    );
    Ok(true)
}

async fn seed_menus<C: ConnectionTrait>(db: &C, now: i64) -> Result<Vec<i64>, DbErr> {
    let mut ids = Vec::new();

    let root = insert_menu(db, 0, "System", "system", "/system", "Layout", 1, "", 1, now).await?;
    ids.push(root);

    for (sort, (name, title, list_perm, buttons)) in DEFAULT_MENUS.iter().enumerate() {
        let page = insert_menu(
            db,
            root,
            title,
            name,
            &format!("/system/{}", name),
            &format!("system/{}/index", name),
            2,
            list_perm,
            sort as i32 + 1,
            now,
        )
        .await?;
        ids.push(page);

        for (pos, perm) in buttons.iter().enumerate() {
            let button = insert_menu(db, page, perm, perm, "", "", 3, perm, pos as i32 + 1, now).await?;
            ids.push(button);
        }
    }
    Ok(ids)
}

#[allow(clippy::too_many_arguments)]
async fn insert_menu<C: ConnectionTrait>(
    db: &C,
    parent_id: i64,
    title: &str,
    name: &str,
    path: &str,
    component: &str,
    menu_type: i32,
    permission: &str,
    sort: i32,
    now: i64,
) -> Result<i64, DbErr> {
    let model = menu::ActiveModel {
        parent_id: Set(parent_id),
        title: Set(title.to_string()),
        name: Set(name.to_string()),
        path: Set(path.to_string()),
        component: Set(component.to_string()),
        icon: Set(String::new()),
        menu_type: Set(menu_type),
        sort: Set(sort),
        status: Set(menu::STATUS_ENABLED),
        visible: Set(1),
        permission: Set(permission.to_string()),
        redirect: Set(String::new()),
        always_show: Set(0),
        breadcrumb: Set(1),
        active_menu: Set(String::new()),
        remark: Set(String::new()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(model.id)
}
