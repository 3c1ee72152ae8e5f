//! Global menu catalogue. Reads are open to permitted users, writes need a system administrator.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{check_len, dedup_ids, like, now, require_ids, Page, Window};
use crate::context::RequestContext;
use crate::entity::menu::{self, MenuType};
use crate::entity::role_menu;
use crate::error::{AppError, AppResult, OptionExt};
use crate::tree::{self, MenuOption, MenuTreeNode, RouterNode, ROOT_ID};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuFilter {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub name: String,
    pub status: Option<i32>,
    #[serde(rename = "type")]
    pub menu_type: Option<i32>,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuTreeFilter {
    pub status: Option<i32>,
    #[serde(rename = "type")]
    pub menu_type: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuOptionFilter {
    #[serde(default)]
    pub all: bool,
    #[serde(default)]
    pub parent_only: bool,
    pub exclude_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuInput {
    #[serde(default)]
    pub parent_id: i64,
    pub title: String,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub icon: String,
    #[serde(rename = "type")]
    pub menu_type: i32,
    #[serde(default)]
    pub sort: i32,
    #[serde(default = "one")]
    pub status: i32,
    #[serde(default = "one")]
    pub visible: i32,
    #[serde(default)]
    pub permission: String,
    #[serde(default)]
    pub redirect: String,
    #[serde(default)]
    pub always_show: i32,
    #[serde(default = "one")]
    pub breadcrumb: i32,
    #[serde(default)]
    pub active_menu: String,
    #[serde(default)]
    pub remark: String,
}

fn one() -> i32 {
    1
}

impl MenuInput {
    fn validate(&self) -> AppResult<()> {
        check_len("title", &self.title, 1, 100)?;
        check_len("name", &self.name, 1, 100)?;
        let kind = MenuType::from_i32(self.menu_type)
            .ok_or_else(|| AppError::Validation("type must be 1, 2 or 3".to_string()))?;
        let min_path = if kind == MenuType::Button { 0 } else { 1 };
        check_len("path", &self.path, min_path, 200)?;
        check_len("component", &self.component, 0, 200)?;
        check_len("icon", &self.icon, 0, 100)?;
        check_status(self.status)?;
        check_len("permission", &self.permission, 0, 200)?;
        check_len("redirect", &self.redirect, 0, 200)?;
        check_len("activeMenu", &self.active_menu, 0, 200)?;
        check_len("remark", &self.remark, 0, 500)
    }

    fn is_button(&self) -> bool {
        self.menu_type == i32::from(MenuType::Button)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMenu {
    pub id: i64,
    #[serde(flatten)]
    pub input: MenuInput,
}

fn check_status(status: i32) -> AppResult<()> {
    if status != menu::STATUS_ENABLED && status != menu::STATUS_DISABLED {
        return Err(AppError::Validation("status must be 0 or 1".to_string()));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct MenuDetail {
    #[serde(flatten)]
    pub menu: menu::Model,
    pub children: Vec<menu::Model>,
}

pub struct MenuService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> MenuService<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    async fn live(&self, id: i64) -> AppResult<menu::Model> {
        menu::Entity::find_by_id(id)
            .filter(menu::Column::DeletedAt.is_null())
            .one(self.db)
            .await?
            .ok_or_not_found(format!("menu {} not found", id))
    }

    async fn all_live(&self) -> AppResult<Vec<menu::Model>> {
        Ok(menu::Entity::find()
            .filter(menu::Column::DeletedAt.is_null())
            .order_by_asc(menu::Column::Sort)
            .order_by_asc(menu::Column::Id)
            .all(self.db)
            .await?)
    }

    async fn ensure_unique(&self, input: &MenuInput, exclude: Option<i64>) -> AppResult<()> {
        let scoped = || {
            let mut q = menu::Entity::find().filter(menu::Column::DeletedAt.is_null());
            if let Some(id) = exclude {
                q = q.filter(menu::Column::Id.ne(id));
            }
            q
        };
        if scoped().filter(menu::Column::Name.eq(input.name.as_str())).count(self.db).await? > 0 {
            return Err(AppError::DuplicateName);
        }
        if !input.is_button() && !input.path.is_empty() {
            let clash = scoped()
                .filter(menu::Column::Path.eq(input.path.as_str()))
                .filter(menu::Column::MenuType.ne(i32::from(MenuType::Button)))
                .count(self.db)
                .await?;
            if clash > 0 {
                return Err(AppError::DuplicatePath);
            }
        }
        Ok(())
    }

    async fn ensure_parent(&self, parent_id: i64) -> AppResult<()> {
        if parent_id == ROOT_ID {
            return Ok(());
        }
        self.live(parent_id)
            .await
            .map_err(|_| AppError::Validation(format!("parent menu {} does not exist", parent_id)))?;
        Ok(())
    }

    pub async fn list(&self, filter: &MenuFilter, window: Window) -> AppResult<Page<menu::Model>> {
        let mut query = menu::Entity::find().filter(menu::Column::DeletedAt.is_null());
        if !filter.title.trim().is_empty() {
            query = query.filter(menu::Column::Title.like(like(&filter.title)));
        }
        if !filter.name.trim().is_empty() {
            query = query.filter(menu::Column::Name.like(like(&filter.name)));
        }
        if let Some(status) = filter.status {
            query = query.filter(menu::Column::Status.eq(status));
        }
        if let Some(menu_type) = filter.menu_type {
            query = query.filter(menu::Column::MenuType.eq(menu_type));
        }
        if let Some(parent_id) = filter.parent_id {
            query = query.filter(menu::Column::ParentId.eq(parent_id));
        }

        let total = query.clone().count(self.db).await?;
        let list = query
            .order_by_asc(menu::Column::Sort)
            .order_by_asc(menu::Column::Id)
            .offset(window.offset())
            .limit(window.size)
            .all(self.db)
            .await?;
        Ok(Page::new(list, total, window))
    }

    pub async fn tree(&self, filter: &MenuTreeFilter) -> AppResult<Vec<MenuTreeNode>> {
        let mut query = menu::Entity::find().filter(menu::Column::DeletedAt.is_null());
        if let Some(status) = filter.status {
            query = query.filter(menu::Column::Status.eq(status));
        }
        if let Some(menu_type) = filter.menu_type {
            query = query.filter(menu::Column::MenuType.eq(menu_type));
        }
        let menus = query
            .order_by_asc(menu::Column::Sort)
            .order_by_asc(menu::Column::Id)
            .all(self.db)
            .await?;
        tree::build_menu_tree(menus)
    }

    pub async fn detail(&self, id: i64) -> AppResult<MenuDetail> {
        let model = self.live(id).await?;
        let children = menu::Entity::find()
            .filter(menu::Column::ParentId.eq(id))
            .filter(menu::Column::DeletedAt.is_null())
            .order_by_asc(menu::Column::Sort)
            .order_by_asc(menu::Column::Id)
            .all(self.db)
            .await?;
        Ok(MenuDetail { menu: model, children })
    }

    pub async fn create(&self, ctx: &RequestContext, input: MenuInput) -> AppResult<menu::Model> {
        ctx.ensure_system_admin()?;
        input.validate()?;
        self.ensure_parent(input.parent_id).await?;
        self.ensure_unique(&input, None).await?;

        let ts = now();
        let created = menu::ActiveModel {
            parent_id: Set(input.parent_id),
            title: Set(input.title),
            name: Set(input.name),
            path: Set(input.path),
            component: Set(input.component),
            icon: Set(input.icon),
            menu_type: Set(input.menu_type),
            sort: Set(input.sort),
            status: Set(input.status),
            visible: Set(input.visible),
            permission: Set(input.permission),
            redirect: Set(input.redirect),
            always_show: Set(input.always_show),
            breadcrumb: Set(input.breadcrumb),
            active_menu: Set(input.active_menu),
            remark: Set(input.remark),
            created_at: Set(ts),
            updated_at: Set(ts),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(self.db)
        .await?;
        Ok(created)
    }

    /// Update a menu. Moving it under itself or one of its descendants fails before anything is written.
    pub async fn update(&self, ctx: &RequestContext, req: UpdateMenu) -> AppResult<menu::Model> {
        ctx.ensure_system_admin()?;
        let input = req.input;
        input.validate()?;
        let model = self.live(req.id).await?;

        if input.parent_id == model.id {
            return Err(AppError::CyclicParent);
        }
        if input.parent_id != ROOT_ID {
            let all = self.all_live().await?;
            if tree::descendant_ids(&all, model.id).contains(&input.parent_id) {
                return Err(AppError::CyclicParent);
            }
        }
        self.ensure_parent(input.parent_id).await?;
        self.ensure_unique(&input, Some(model.id)).await?;

        let mut active: menu::ActiveModel = model.into();
        active.parent_id = Set(input.parent_id);
        active.title = Set(input.title);
        active.name = Set(input.name);
        active.path = Set(input.path);
        active.component = Set(input.component);
        active.icon = Set(input.icon);
        active.menu_type = Set(input.menu_type);
        active.sort = Set(input.sort);
        active.status = Set(input.status);
        active.visible = Set(input.visible);
        active.permission = Set(input.permission);
        active.redirect = Set(input.redirect);
        active.always_show = Set(input.always_show);
        active.breadcrumb = Set(input.breadcrumb);
        active.active_menu = Set(input.active_menu);
        active.remark = Set(input.remark);
        active.updated_at = Set(now());
        Ok(active.update(self.db).await?)
    }

    pub async fn delete(&self, ctx: &RequestContext, id: i64) -> AppResult<()> {
        self.batch_delete(ctx, &[id]).await
    }

    /// Soft-delete menus that have no remaining children and no role bindings.
    /// Children deleted in the same batch do not count.
    pub async fn batch_delete(&self, ctx: &RequestContext, ids: &[i64]) -> AppResult<()> {
        ctx.ensure_system_admin()?;
        require_ids("ids", ids)?;
        let ids = dedup_ids(ids);
        let batch: HashSet<i64> = ids.iter().copied().collect();

        let mut models = Vec::with_capacity(ids.len());
        for id in &ids {
            let model = self.live(*id).await?;
            let children: Vec<i64> = menu::Entity::find()
                .filter(menu::Column::ParentId.eq(*id))
                .filter(menu::Column::DeletedAt.is_null())
                .all(self.db)
                .await?
                .into_iter()
                .map(|m| m.id)
                .filter(|child| !batch.contains(child))
                .collect();
            if !children.is_empty() {
                return Err(AppError::InUse(format!("menu '{}' still has child menus", model.title)));
            }
            let bindings = role_menu::Entity::find()
                .filter(role_menu::Column::MenuId.eq(*id))
                .count(self.db)
                .await?;
            if bindings > 0 {
                return Err(AppError::InUse(format!(
                    "menu '{}' is bound to {} role(s)",
                    model.title, bindings
                )));
            }
            models.push(model);
        }

        let ts = now();
        let txn = self.db.begin().await?;
        for model in models {
            let mut active: menu::ActiveModel = model.into();
            active.deleted_at = Set(Some(ts));
            active.updated_at = Set(ts);
            active.update(&txn).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    pub async fn update_status(&self, ctx: &RequestContext, id: i64, status: i32) -> AppResult<()> {
        ctx.ensure_system_admin()?;
        check_status(status)?;
        let model = self.live(id).await?;
        let mut active: menu::ActiveModel = model.into();
        active.status = Set(status);
        active.updated_at = Set(now());
        active.update(self.db).await?;
        Ok(())
    }

    pub async fn options(&self, filter: &MenuOptionFilter) -> AppResult<Vec<MenuOption>> {
        let mut menus = self.all_live().await?;
        if !filter.all {
            menus.retain(|m| m.is_enabled());
        }
        if let Some(excluded) = filter.exclude_id {
            let mut dropped = tree::descendant_ids(&menus, excluded);
            dropped.insert(excluded);
            menus.retain(|m| !dropped.contains(&m.id));
        }
        tree::build_menu_option_tree(menus, filter.parent_only)
    }

    /// Router tree over every enabled menu
    pub async fn routers(&self) -> AppResult<Vec<RouterNode>> {
        let mut menus = self.all_live().await?;
        menus.retain(|m| m.is_enabled());
        tree::build_router_tree(menus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::fixtures::{context, identity};
    use crate::permission::role_code;
    use crate::testing::{self, TestData};

    fn admin() -> RequestContext {
        context(1, "system", Some(identity(1, 1, "system", role_code::SUPER_ADMIN)))
    }

    fn input(parent_id: i64, name: &str, path: &str, menu_type: i32) -> MenuInput {
        MenuInput {
            parent_id,
            title: name.to_uppercase(),
            name: name.to_string(),
            path: path.to_string(),
            component: String::new(),
            icon: String::new(),
            menu_type,
            sort: 0,
            status: 1,
            visible: 1,
            permission: String::new(),
            redirect: String::new(),
            always_show: 0,
            breadcrumb: 1,
            active_menu: String::new(),
            remark: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_rules() {
        let db = testing::setup_db().await;
        let service = MenuService::new(&db);
        let ctx = admin();

        let dir = service.create(&ctx, input(0, "system", "/system", 1)).await.unwrap();
        service.create(&ctx, input(dir.id, "users", "/system/users", 2)).await.unwrap();
        // buttons may share an empty path
        service.create(&ctx, input(dir.id, "btn_a", "", 3)).await.unwrap();
        service.create(&ctx, input(dir.id, "btn_b", "", 3)).await.unwrap();

        assert!(matches!(
            service.create(&ctx, input(0, "users", "/other", 2)).await,
            Err(AppError::DuplicateName)
        ));
        assert!(matches!(
            service.create(&ctx, input(0, "users2", "/system/users", 2)).await,
            Err(AppError::DuplicatePath)
        ));
        assert!(matches!(
            service.create(&ctx, input(0, "nopath", "", 2)).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.create(&ctx, input(999, "orphan", "/orphan", 2)).await,
            Err(AppError::Validation(_))
        ));

        let tenant_ctx = context(2, "acme", Some(identity(9, 2, "acme", role_code::TENANT_ADMIN)));
        assert!(matches!(
            service.create(&tenant_ctx, input(0, "x", "/x", 2)).await,
            Err(AppError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn test_cyclic_parent_rejected() {
        let db = testing::setup_db().await;
        let service = MenuService::new(&db);
        let ctx = admin();
        let a = service.create(&ctx, input(0, "a", "/a", 1)).await.unwrap();
        let b = service.create(&ctx, input(a.id, "b", "/a/b", 1)).await.unwrap();
        let c = service.create(&ctx, input(b.id, "c", "/a/b/c", 2)).await.unwrap();

        let onto_self = UpdateMenu {
            id: a.id,
            input: input(a.id, "a", "/a", 1),
        };
        assert!(matches!(service.update(&ctx, onto_self).await, Err(AppError::CyclicParent)));

        let onto_grandchild = UpdateMenu {
            id: a.id,
            input: input(c.id, "a", "/a", 1),
        };
        assert!(matches!(service.update(&ctx, onto_grandchild).await, Err(AppError::CyclicParent)));
        let stored = service.detail(a.id).await.unwrap();
        assert_eq!(stored.menu.parent_id, 0);
        assert_eq!(stored.menu, a);

        // moving a leaf up is fine
        let lift = UpdateMenu {
            id: c.id,
            input: input(a.id, "c", "/a/c", 2),
        };
        assert_eq!(service.update(&ctx, lift).await.unwrap().parent_id, a.id);
        assert_eq!(service.detail(a.id).await.unwrap().children.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_in_use() {
        let db = testing::setup_db().await;
        let data = TestData::new(&db);
        let acme = data.tenant("acme").await;
        let service = MenuService::new(&db);
        let ctx = admin();
        let dir = service.create(&ctx, input(0, "d", "/d", 1)).await.unwrap();
        let page = service.create(&ctx, input(dir.id, "p", "/d/p", 2)).await.unwrap();
        let bound = service.create(&ctx, input(0, "bound", "/bound", 2)).await.unwrap();
        let role = data.role(acme.id, "clerk", 4).await;
        data.bind_menus(acme.id, role.id, &[bound.id]).await;

        assert!(matches!(service.delete(&ctx, dir.id).await, Err(AppError::InUse(_))));
        assert!(matches!(service.delete(&ctx, bound.id).await, Err(AppError::InUse(_))));
        assert!(matches!(
            service.batch_delete(&ctx, &[page.id, bound.id]).await,
            Err(AppError::InUse(_))
        ));
        assert!(service.detail(page.id).await.is_ok());

        service.batch_delete(&ctx, &[dir.id, page.id]).await.unwrap();
        assert!(matches!(service.detail(dir.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_options_and_routers() {
        let db = testing::setup_db().await;
        let service = MenuService::new(&db);
        let ctx = admin();
        let dir = service.create(&ctx, input(0, "d", "/d", 1)).await.unwrap();
        let page = service.create(&ctx, input(dir.id, "p", "/d/p", 2)).await.unwrap();
        service.create(&ctx, input(page.id, "btn", "", 3)).await.unwrap();
        let off = service.create(&ctx, input(0, "off", "/off", 2)).await.unwrap();
        service.update_status(&ctx, off.id, 0).await.unwrap();

        let options = service.options(&MenuOptionFilter::default()).await.unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].children[0].children.len(), 1);

        let filter = MenuOptionFilter {
            all: true,
            parent_only: true,
            exclude_id: Some(page.id),
        };
        let options = service.options(&filter).await.unwrap();
        assert_eq!(options.len(), 2);
        assert!(options[0].children.is_empty());
        assert!(options[1].disabled);

        let routers = service.routers().await.unwrap();
        assert_eq!(routers.len(), 1);
        assert_eq!(routers[0].children.len(), 1);
        assert!(routers[0].children[0].children.is_empty());

        let filter = MenuTreeFilter {
            status: Some(1),
            menu_type: None,
        };
        assert_eq!(service.tree(&filter).await.unwrap().len(), 1);
        let page_list = service
            .list(
                &MenuFilter {
                    parent_id: Some(dir.id),
                    ..Default::default()
                },
                Window::default(),
            )
            .await
            .unwrap();
        assert_eq!(page_list.total, 1);
    }
}
