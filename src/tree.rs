//! Tree builder for menu-like records
//!
//! Flat, pre-ordered lists are indexed once (parent id -> child positions)
//! and assembled by recursion over that index. Sibling order follows the
//! input order.

use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::entity::menu::{self, MenuType};
use crate::error::{AppError, AppResult};

/// Hard limit on nesting. Deeper data means corrupted parent links.
pub const MAX_DEPTH: usize = 64;

/// Parent id of top-level menus
pub const ROOT_ID: i64 = 0;

pub trait TreeItem {
    fn id(&self) -> i64;
    fn parent_id(&self) -> i64;
}

impl TreeItem for menu::Model {
    fn id(&self) -> i64 {
        self.id
    }

    fn parent_id(&self) -> i64 {
        self.parent_id
    }
}

/// Build a forest under `root`, turning each item and its built children into `N`.
///
/// Items whose parent is never reached are dropped. Fails with
/// `TreeTooDeep` past `MAX_DEPTH` levels or when a node is reached twice.
pub fn build_with<T, N, F>(items: Vec<T>, root: i64, mut make: F) -> AppResult<Vec<N>>
where
    T: TreeItem,
    F: FnMut(T, Vec<N>) -> N,
{
    let mut index: HashMap<i64, Vec<usize>> = HashMap::new();
    for (pos, item) in items.iter().enumerate() {
        index.entry(item.parent_id()).or_default().push(pos);
    }
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    assemble(root, 0, &index, &mut slots, &mut make)
}

fn assemble<T, N, F>(
    parent: i64,
    depth: usize,
    index: &HashMap<i64, Vec<usize>>,
    slots: &mut [Option<T>],
    make: &mut F,
) -> AppResult<Vec<N>>
where
    T: TreeItem,
    F: FnMut(T, Vec<N>) -> N,
{
    let Some(positions) = index.get(&parent) else {
        return Ok(Vec::new());
    };
    if depth >= MAX_DEPTH {
        return Err(AppError::TreeTooDeep);
    }

    let mut nodes = Vec::with_capacity(positions.len());
    for &pos in positions {
        let item = slots[pos].take().ok_or(AppError::TreeTooDeep)?;
        let children = assemble(item.id(), depth + 1, index, slots, make)?;
        nodes.push(make(item, children));
    }
    Ok(nodes)
}

/// Generic node, mostly useful for inspecting structure
#[derive(Debug, Clone, PartialEq)]
pub struct Node<T> {
    pub item: T,
    pub children: Vec<Node<T>>,
}

pub fn build_tree<T: TreeItem>(items: Vec<T>, root: i64) -> AppResult<Vec<Node<T>>> {
    build_with(items, root, |item, children| Node { item, children })
}

/// Pre-order traversal back into a flat list
pub fn flatten<T>(nodes: Vec<Node<T>>) -> Vec<T> {
    let mut out = Vec::new();
    let mut stack: Vec<Node<T>> = nodes.into_iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push(node.item);
        stack.extend(node.children.into_iter().rev());
    }
    out
}

/// Every id strictly below `id`. Terminates on cyclic data.
pub fn descendant_ids<T: TreeItem>(items: &[T], id: i64) -> HashSet<i64> {
    let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
    for item in items {
        children.entry(item.parent_id()).or_default().push(item.id());
    }

    let mut found = HashSet::new();
    let mut queue = VecDeque::from([id]);
    while let Some(current) = queue.pop_front() {
        for &child in children.get(&current).into_iter().flatten() {
            if child != id && found.insert(child) {
                queue.push_back(child);
            }
        }
    }
    found
}

/// Menu with nested children
#[derive(Debug, Clone, Serialize)]
pub struct MenuTreeNode {
    #[serde(flatten)]
    pub menu: menu::Model,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuTreeNode>,
}

pub fn build_menu_tree(menus: Vec<menu::Model>) -> AppResult<Vec<MenuTreeNode>> {
    build_with(menus, ROOT_ID, |menu, children| MenuTreeNode { menu, children })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterMeta {
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub icon: String,
    pub no_cache: bool,
    pub breadcrumb: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub active_menu: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub permissions: String,
}

/// Front-end route. Buttons never appear here.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterNode {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub component: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub redirect: String,
    pub always_show: bool,
    pub hidden: bool,
    pub meta: RouterMeta,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RouterNode>,
}

impl RouterNode {
    fn from_menu(menu: menu::Model, children: Vec<RouterNode>) -> Self {
        Self {
            id: menu.id,
            name: menu.title.clone(),
            path: menu.path,
            component: menu.component,
            redirect: menu.redirect,
            always_show: menu.always_show == 1,
            hidden: menu.visible == 0,
            meta: RouterMeta {
                title: menu.title,
                icon: menu.icon,
                no_cache: false,
                breadcrumb: menu.breadcrumb == 1,
                active_menu: menu.active_menu,
                permissions: menu.permission,
            },
            children,
        }
    }
}

pub fn build_router_tree(menus: Vec<menu::Model>) -> AppResult<Vec<RouterNode>> {
    let routable: Vec<menu::Model> = menus.into_iter().filter(|m| !m.is_button()).collect();
    build_with(routable, ROOT_ID, RouterNode::from_menu)
}

/// Selectable entry for parent pickers
#[derive(Debug, Clone, Serialize)]
pub struct MenuOption {
    pub value: i64,
    pub label: String,
    #[serde(rename = "type")]
    pub menu_type: i32,
    pub disabled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuOption>,
}

/// Option tree. With `parent_only`, buttons are left out since they cannot hold children.
pub fn build_menu_option_tree(menus: Vec<menu::Model>, parent_only: bool) -> AppResult<Vec<MenuOption>> {
    let menus: Vec<menu::Model> = menus
        .into_iter()
        .filter(|m| !parent_only || matches!(m.kind(), Some(MenuType::Directory | MenuType::Menu)))
        .collect();
    build_with(menus, ROOT_ID, |menu, children| {
        let disabled = !menu.is_enabled();
        MenuOption {
            value: menu.id,
            label: menu.title,
            menu_type: menu.menu_type,
            disabled,
            children,
        }
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::menu;
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(i64, i64);

    impl TreeItem for Item {
        fn id(&self) -> i64 {
            self.0
        }
        fn parent_id(&self) -> i64 {
            self.1
        }
    }

    fn shape(nodes: &[Node<Item>]) -> Vec<(i64, Vec<i64>)> {
        let mut out = Vec::new();
        for node in nodes {
            out.push((node.item.0, node.children.iter().map(|c| c.item.0).collect()));
            out.extend(shape(&node.children));
        }
        out
    }

    #[test]
    fn test_build_tree_basic() {
        let items = vec![Item(1, 0), Item(2, 1), Item(3, 1), Item(4, 2)];
        let tree = build_tree(items, 0).unwrap();

        assert_eq!(tree.len(), 1);
        assert_eq!(
            shape(&tree),
            vec![(1, vec![2, 3]), (2, vec![4]), (4, vec![]), (3, vec![])]
        );
    }

    #[test]
    fn test_sibling_order_follows_input() {
        let items = vec![Item(5, 0), Item(3, 0), Item(9, 0)];
        let tree = build_tree(items, 0).unwrap();
        let ids: Vec<i64> = tree.iter().map(|n| n.item.0).collect();
        assert_eq!(ids, vec![5, 3, 9]);
    }

    #[test]
    fn test_flatten_and_rebuild() {
        let items = vec![
            Item(1, 0),
            Item(2, 1),
            Item(3, 1),
            Item(4, 2),
            Item(5, 0),
            Item(6, 5),
            Item(7, 4),
        ];
        let tree = build_tree(items, 0).unwrap();
        let flat = flatten(tree.clone());
        assert_eq!(
            flat.iter().map(|i| i.0).collect::<Vec<_>>(),
            vec![1, 2, 4, 7, 3, 5, 6]
        );

        let rebuilt = build_tree(flat, 0).unwrap();
        assert_eq!(rebuilt, tree);
    }

    #[test]
    fn test_orphans_and_cycles_are_not_reached() {
        // 8 and 9 point at each other and never hang off the root
        let items = vec![Item(1, 0), Item(8, 9), Item(9, 8), Item(10, 42)];
        let tree = build_tree(items, 0).unwrap();
        assert_eq!(flatten(tree).len(), 1);
    }

    #[test]
    fn test_self_loop_under_root_is_rejected() {
        let items = vec![Item(1, 0), Item(2, 1), Item(2, 2)];
        // second copy of id 2 hangs under itself and is reachable through the first
        let result = build_tree(items, 0);
        assert!(matches!(result, Err(AppError::TreeTooDeep)));
    }

    #[test]
    fn test_depth_cap() {
        let items: Vec<Item> = (1..=(MAX_DEPTH as i64 + 1)).map(|i| Item(i, i - 1)).collect();
        assert!(matches!(build_tree(items, 0), Err(AppError::TreeTooDeep)));

        let items: Vec<Item> = (1..=(MAX_DEPTH as i64)).map(|i| Item(i, i - 1)).collect();
        assert!(build_tree(items, 0).is_ok());
    }

    #[test]
    fn test_descendant_ids() {
        let items = vec![Item(1, 0), Item(2, 1), Item(3, 2), Item(4, 0), Item(5, 3)];
        let ids = descendant_ids(&items, 1);
        assert_eq!(ids, HashSet::from([2, 3, 5]));
        assert!(descendant_ids(&items, 4).is_empty());

        let cyclic = vec![Item(1, 2), Item(2, 1)];
        assert_eq!(descendant_ids(&cyclic, 1), HashSet::from([2]));
    }

    #[test]
    fn test_router_tree_excludes_buttons() {
        let mut dir = menu(1, 0, 1);
        dir.redirect = "/m2".into();
        let mut page = menu(2, 1, 2);
        page.visible = 0;
        page.permission = "user:list".into();
        let button = menu(3, 2, 3);

        let routers = build_router_tree(vec![dir, page, button]).unwrap();
        assert_eq!(routers.len(), 1);
        assert_eq!(routers[0].redirect, "/m2");
        assert_eq!(routers[0].children.len(), 1);

        let child = &routers[0].children[0];
        assert!(child.hidden);
        assert!(child.children.is_empty());
        assert_eq!(child.meta.permissions, "user:list");

        let json = serde_json::to_value(child).unwrap();
        assert!(json.get("redirect").is_none());
        assert!(json.get("children").is_none());
        assert_eq!(json["name"], "Menu 2");
    }

    #[test]
    fn test_option_tree_parent_only() {
        let mut disabled = menu(2, 1, 2);
        disabled.status = menu::STATUS_DISABLED;
        let menus = vec![menu(1, 0, 1), disabled, menu(3, 2, 3)];

        let all = build_menu_option_tree(menus.clone(), false).unwrap();
        assert_eq!(all[0].children[0].children.len(), 1);
        assert!(!all[0].disabled);
        assert!(all[0].children[0].disabled);
        assert_eq!(all[0].children[0].label, "Menu 2");
        assert_eq!(all[0].children[0].value, 2);

        let parents = build_menu_option_tree(menus, true).unwrap();
        assert!(parents[0].children[0].children.is_empty());
    }

    #[test]
    fn test_menu_tree_omits_empty_children() {
        let tree = build_menu_tree(vec![menu(1, 0, 2)]).unwrap();
        let json = serde_json::to_value(&tree[0]).unwrap();
        assert!(json.get("children").is_none());
        assert_eq!(json["type"], 2);
        assert_eq!(json["parentId"], 0);
    }
}
