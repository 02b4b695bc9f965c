//! The application's route table.

use super::{RouteMeta, RouteRecord, RouteTable};

fn page(title: &str, icon: Option<&str>, keep_alive: bool) -> RouteMeta {
    RouteMeta {
        icon: icon.map(str::to_string),
        keep_alive,
        ..RouteMeta::titled(title)
    }
}

fn hidden(meta: RouteMeta) -> RouteMeta {
    RouteMeta { hidden: true, ..meta }
}

pub fn default_table() -> RouteTable {
    let layout = RouteRecord::new(
        "/",
        Some("Layout"),
        RouteMeta {
            requires_auth: true,
            ..RouteMeta::default()
        },
    )
    .with_children(vec![
        RouteRecord::new("", Some("Home"), page("My Drive", Some("home"), true)),
        RouteRecord::new("folder/:folderId", Some("Folder"), hidden(page("Folder", None, true))),
        RouteRecord::new("starred", Some("Starred"), page("Starred", Some("star"), true)),
        RouteRecord::new("recycle", Some("RecycleBin"), page("Recycle Bin", Some("delete"), true)),
        RouteRecord::new("search", Some("Search"), page("Search Results", Some("search"), false)),
        RouteRecord::new("shares", Some("ShareManage"), page("My Shares", Some("share"), true)),
        RouteRecord::new("detail/:fileId", Some("FileDetail"), hidden(page("File Details", None, false))),
        RouteRecord::new("settings", Some("Settings"), page("Settings", Some("setting"), true)),
    ]);

    RouteTable::new(vec![
        layout,
        RouteRecord::new(
            "/login",
            Some("Login"),
            RouteMeta {
                guest_only: true,
                hidden: true,
                ..RouteMeta::default()
            },
        ),
        RouteRecord::new("/register", Some("Register"), hidden(RouteMeta::titled("Register"))),
        RouteRecord::new("/s/:shareId", Some("Share"), hidden(RouteMeta::titled("Shared Files"))),
        RouteRecord::new(
            "/:pathMatch(.*)*",
            Some("NotFound"),
            hidden(RouteMeta::titled("Page Not Found")),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_skips_hidden_pages() {
        let table = default_table();
        let menu: Vec<_> = table.menu().iter().filter_map(|r| r.name.as_deref()).collect();
        assert_eq!(
            menu,
            ["Home", "Starred", "RecycleBin", "Search", "ShareManage", "Settings"]
        );
        assert!(table.resolve("/folder/3").is_some());
    }

    #[test]
    fn test_only_layout_requires_auth() {
        let table = default_table();
        let protected: Vec<_> = table
            .routes()
            .iter()
            .filter(|r| r.meta.requires_auth)
            .filter_map(|r| r.name.as_deref())
            .collect();
        assert_eq!(protected, ["Layout"]);
        assert_eq!(table.routes()[0].children.len(), 8);
    }

    #[test]
    fn test_every_child_inherits_auth() {
        let table = default_table();
        for path in ["/", "/folder/1", "/starred", "/recycle", "/search", "/shares", "/detail/3", "/settings"] {
            assert!(table.resolve(path).unwrap().requires_auth(), "{}", path);
        }
        for path in ["/login", "/register", "/s/x", "/whatever"] {
            assert!(!table.resolve(path).unwrap().requires_auth(), "{}", path);
        }
    }
}
