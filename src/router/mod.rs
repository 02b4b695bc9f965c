//! Client-side routing with an authentication guard.
//!
//! A `RouteTable` resolves a path to the chain of matching records. Before
//! every navigation `guard` decides, from the target route and token
//! presence alone, whether to proceed (and with what title) or redirect.
//! `Router` ties the table to a `Session` and acts as the HTTP client's
//! `Navigator`, so a session-expired response lands on the login route.

pub mod routes;

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use thiserror::Error;

use crate::config::DEFAULT_APP_TITLE;
use crate::host::{Navigator, TitleSink};
use crate::session::Session;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const HOME_PATH: &str = "/";
/// Redirects followed by one `navigate` call before giving up.
pub const MAX_REDIRECTS: usize = 8;

/// Per-route flags and display data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub title: Option<String>,
    pub icon: Option<String>,
    /// Applies to the record and everything nested under it.
    pub requires_auth: bool,
    /// Only reachable without a token.
    pub guest_only: bool,
    pub keep_alive: bool,
    /// Left out of navigation menus; still routable.
    pub hidden: bool,
}

impl RouteMeta {
    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    /// `:name(.*)*`, swallowing every remaining segment.
    CatchAll(String),
}

fn parse_pattern(path: &str) -> Vec<Segment> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix(':') {
            Some(rest) => {
                let name = rest.split('(').next().unwrap_or(rest).to_string();
                if rest.ends_with('*') || rest.ends_with('+') {
                    Segment::CatchAll(name)
                } else {
                    Segment::Param(name)
                }
            }
            None => Segment::Static(s.to_string()),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct RouteRecord {
    /// Pattern relative to the parent record.
    pub path: String,
    pub name: Option<String>,
    pub meta: RouteMeta,
    pub children: Vec<RouteRecord>,
    segments: Vec<Segment>,
}

impl RouteRecord {
    pub fn new(path: &str, name: Option<&str>, meta: RouteMeta) -> Self {
        Self {
            path: path.to_string(),
            name: name.map(str::to_string),
            meta,
            children: Vec::new(),
            segments: parse_pattern(path),
        }
    }

    pub fn with_children(mut self, children: Vec<RouteRecord>) -> Self {
        self.children = children;
        self
    }
}

/// The outcome of matching a path against a `RouteTable`.
#[derive(Debug, Clone)]
pub struct ResolvedRoute<'a> {
    /// Path without query or fragment.
    pub path: String,
    pub full_path: String,
    /// Matched records, outermost first.
    pub matched: Vec<&'a RouteRecord>,
    pub params: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
}

impl ResolvedRoute<'_> {
    pub fn name(&self) -> Option<&str> {
        self.matched.last().and_then(|r| r.name.as_deref())
    }

    pub fn requires_auth(&self) -> bool {
        self.matched.iter().any(|r| r.meta.requires_auth)
    }

    pub fn guest_only(&self) -> bool {
        self.matched.iter().any(|r| r.meta.guest_only)
    }

    /// Title of the innermost record that sets one.
    pub fn title(&self) -> Option<&str> {
        self.matched
            .iter()
            .rev()
            .find_map(|r| r.meta.title.as_deref())
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteRecord>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteRecord>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[RouteRecord] {
        &self.routes
    }

    /// Titled, non-hidden records in table order, depth first.
    pub fn menu(&self) -> Vec<&RouteRecord> {
        fn walk<'a>(records: &'a [RouteRecord], out: &mut Vec<&'a RouteRecord>) {
            for record in records {
                if record.meta.title.is_some() && !record.meta.hidden {
                    out.push(record);
                }
                walk(&record.children, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.routes, &mut out);
        out
    }

    /// Match `full_path` (path plus optional query) against the table.
    ///
    /// Records are tried in order, depth first, so a catch-all placed last
    /// only sees what nothing else claimed.
    pub fn resolve(&self, full_path: &str) -> Option<ResolvedRoute<'_>> {
        let without_fragment = full_path.split('#').next().unwrap_or_default();
        let (raw_path, raw_query) = match without_fragment.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (without_fragment, None),
        };
        let path = if raw_path.starts_with('/') {
            raw_path.to_string()
        } else {
            format!("/{}", raw_path)
        };
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let mut matched = Vec::new();
        let mut params = BTreeMap::new();
        let found = self
            .routes
            .iter()
            .any(|record| match_record(record, &segments, &mut matched, &mut params));
        if !found {
            return None;
        }

        let query = raw_query.map(parse_query).unwrap_or_default();
        let full_path = match raw_query {
            Some(q) if !q.is_empty() => format!("{}?{}", path, q),
            _ => path.clone(),
        };

        Some(ResolvedRoute {
            path,
            full_path,
            matched,
            params,
            query,
        })
    }
}

fn match_record<'a>(
    record: &'a RouteRecord,
    segments: &[&str],
    chain: &mut Vec<&'a RouteRecord>,
    params: &mut BTreeMap<String, String>,
) -> bool {
    let mut local = BTreeMap::new();
    let rest = match match_segments(&record.segments, segments, &mut local) {
        Some(rest) => rest,
        None => return false,
    };

    chain.push(record);
    for child in &record.children {
        let mut nested = BTreeMap::new();
        if match_record(child, rest, chain, &mut nested) {
            params.extend(local);
            params.extend(nested);
            return true;
        }
    }
    if rest.is_empty() {
        params.extend(local);
        return true;
    }
    chain.pop();
    false
}

fn match_segments<'s, 'p>(
    pattern: &[Segment],
    input: &'s [&'p str],
    params: &mut BTreeMap<String, String>,
) -> Option<&'s [&'p str]> {
    let mut rest = input;
    for segment in pattern {
        match segment {
            Segment::Static(expected) => match rest.split_first() {
                Some((first, tail)) if *first == expected.as_str() => rest = tail,
                _ => return None,
            },
            Segment::Param(name) => {
                let (first, tail) = rest.split_first()?;
                params.insert(name.clone(), decode(first));
                rest = tail;
            }
            Segment::CatchAll(name) => {
                let joined: Vec<String> = rest.iter().map(|s| decode(s)).collect();
                params.insert(name.clone(), joined.join("/"));
                rest = &[];
            }
        }
    }
    Some(rest)
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

fn parse_query(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode(k), decode(v)),
            None => (decode(pair), String::new()),
        })
        .collect()
}

/// What the guard decided for one navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed { title: String },
    Redirect(String),
}

/// `/login?redirect=<path>`. Only characters that would end or split the
/// query value are escaped, so the path keeps its slashes.
pub fn login_redirect(redirect: &str) -> String {
    let mut url = format!("{}?redirect=", LOGIN_PATH);
    for c in redirect.chars() {
        match c {
            '%' => url.push_str("%25"),
            '&' => url.push_str("%26"),
            '#' => url.push_str("%23"),
            '+' => url.push_str("%2B"),
            ' ' => url.push_str("%20"),
            _ => url.push(c),
        }
    }
    url
}

/// Whether a full path (query included) points at the login route.
pub fn is_login_path(full_path: &str) -> bool {
    let path = full_path.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/') == LOGIN_PATH
}

pub fn document_title(route_title: Option<&str>, app_title: &str) -> String {
    match route_title {
        Some(title) => format!("{} - {}", title, app_title),
        None => app_title.to_string(),
    }
}

/// Decide a navigation with the default application title.
pub fn guard(target: &ResolvedRoute<'_>, has_token: bool) -> GuardDecision {
    guard_with_title(target, has_token, DEFAULT_APP_TITLE)
}

/// Decide a navigation.
///
/// Routes needing auth send anonymous visitors to the login page, carrying
/// the original full path; signed-in visitors to login/register go home.
pub fn guard_with_title(target: &ResolvedRoute<'_>, has_token: bool, app_title: &str) -> GuardDecision {
    if target.requires_auth() && !has_token {
        return GuardDecision::Redirect(login_redirect(&target.full_path));
    }
    let guest_page =
        target.path == LOGIN_PATH || target.path == REGISTER_PATH || target.guest_only();
    if has_token && guest_page {
        return GuardDecision::Redirect(HOME_PATH.to_string());
    }
    GuardDecision::Proceed {
        title: document_title(target.title(), app_title),
    }
}

/// Where the router currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub full_path: String,
    pub name: Option<String>,
    pub params: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
}

impl From<&ResolvedRoute<'_>> for Location {
    fn from(route: &ResolvedRoute<'_>) -> Self {
        Self {
            path: route.path.clone(),
            full_path: route.full_path.clone(),
            name: route.name().map(str::to_string),
            params: route.params.clone(),
            query: route.query.clone(),
        }
    }
}

impl Location {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("no route matches {0}")]
    NoMatch(String),

    #[error("too many redirects navigating to {0}")]
    TooManyRedirects(String),
}

struct RouterInner {
    table: RouteTable,
    session: Arc<Session>,
    titles: Arc<dyn TitleSink>,
    app_title: String,
    current: RwLock<Location>,
}

/// Guarded navigation over a `RouteTable`. Cloning shares the location.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    pub fn new(table: RouteTable, session: Arc<Session>, titles: Arc<dyn TitleSink>, app_title: &str) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                table,
                session,
                titles,
                app_title: app_title.to_string(),
                current: RwLock::new(Location {
                    path: HOME_PATH.to_string(),
                    full_path: HOME_PATH.to_string(),
                    ..Location::default()
                }),
            }),
        }
    }

    pub fn table(&self) -> &RouteTable {
        &self.inner.table
    }

    pub fn current(&self) -> Location {
        match self.inner.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Navigate to `path`, following guard redirects.
    ///
    /// On success the title has been written and the returned location is
    /// now current.
    pub fn navigate(&self, path: &str) -> Result<Location, NavigationError> {
        let has_token = self.inner.session.is_logged_in();
        let mut target = path.to_string();

        for _ in 0..=MAX_REDIRECTS {
            let resolved = self
                .inner
                .table
                .resolve(&target)
                .ok_or_else(|| NavigationError::NoMatch(target.clone()))?;

            match guard_with_title(&resolved, has_token, &self.inner.app_title) {
                GuardDecision::Redirect(next) => {
                    log::debug!("Redirecting {} to {}", resolved.full_path, next);
                    target = next;
                }
                GuardDecision::Proceed { title } => {
                    self.inner.titles.set_title(&title);
                    let location = Location::from(&resolved);
                    match self.inner.current.write() {
                        Ok(mut guard) => *guard = location.clone(),
                        Err(poisoned) => *poisoned.into_inner() = location.clone(),
                    }
                    return Ok(location);
                }
            }
        }

        Err(NavigationError::TooManyRedirects(path.to_string()))
    }

    fn follow(&self, target: &str) {
        if let Err(e) = self.navigate(target) {
            log::warn!("Navigation to {} failed: {}", target, e);
        }
    }
}

impl Navigator for Router {
    fn current_path(&self) -> String {
        self.current().full_path
    }

    /// Navigate to the login route now, or after `delay` on the tokio
    /// runtime when one is running.
    fn redirect_to_login(&self, redirect: &str, delay: Duration) {
        let target = login_redirect(redirect);
        if delay.is_zero() {
            self.follow(&target);
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let router = self.clone();
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    router.follow(&target);
                });
            }
            Err(_) => self.follow(&target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Titles {
        seen: Mutex<Vec<String>>,
    }

    impl TitleSink for Titles {
        fn set_title(&self, title: &str) {
            self.seen.lock().unwrap().push(title.to_string());
        }
    }

    fn router() -> (Router, Arc<Session>, Arc<Titles>) {
        let session = Session::in_memory();
        let titles = Arc::new(Titles::default());
        let router = Router::new(routes::default_table(), session.clone(), titles.clone(), DEFAULT_APP_TITLE);
        (router, session, titles)
    }

    #[test]
    fn test_resolve_nested_params_and_query() {
        let table = routes::default_table();
        let route = table.resolve("/folder/42?sort=name&dir=desc").unwrap();

        assert_eq!(route.name(), Some("Folder"));
        assert_eq!(route.matched.len(), 2);
        assert_eq!(route.matched[0].name.as_deref(), Some("Layout"));
        assert_eq!(route.params.get("folderId").map(String::as_str), Some("42"));
        assert_eq!(route.query_value("dir"), Some("desc"));
        assert_eq!(route.path, "/folder/42");
        assert_eq!(route.full_path, "/folder/42?sort=name&dir=desc");
        assert!(route.requires_auth());
    }

    #[test]
    fn test_resolve_root_and_catch_all() {
        let table = routes::default_table();
        assert_eq!(table.resolve("/").unwrap().name(), Some("Home"));
        assert_eq!(table.resolve("").unwrap().name(), Some("Home"));
        assert_eq!(table.resolve("/s/abc%20def").unwrap().params["shareId"], "abc def");

        let missing = table.resolve("/no/such/page").unwrap();
        assert_eq!(missing.name(), Some("NotFound"));
        assert_eq!(missing.params["pathMatch"], "no/such/page");
        assert!(!missing.requires_auth());
    }

    #[test]
    fn test_guard_requires_auth_without_token() {
        let table = routes::default_table();
        let target = table.resolve("/starred?view=grid").unwrap();

        assert_eq!(
            guard(&target, false),
            GuardDecision::Redirect("/login?redirect=/starred?view=grid".to_string())
        );
        assert_eq!(
            guard(&target, true),
            GuardDecision::Proceed {
                title: "Starred - Cloud Drive".to_string()
            }
        );
    }

    #[test]
    fn test_login_redirect_keeps_slashes_and_round_trips() {
        assert_eq!(login_redirect("/settings"), "/login?redirect=/settings");

        let table = routes::default_table();
        for original in ["/folder/42?sort=name&dir=desc", "/search?keyword=a+b c#top", "/s/abc%20def"] {
            let redirect = login_redirect(original);
            let login = table.resolve(&redirect).unwrap();
            assert_eq!(login.name(), Some("Login"));
            assert_eq!(login.query_value("redirect"), Some(original));
        }
    }

    #[test]
    fn test_is_login_path() {
        assert!(is_login_path("/login"));
        assert!(is_login_path("/login?redirect=/settings"));
        assert!(!is_login_path("/login-help"));
        assert!(!is_login_path("/folder/7?next=/login"));
    }

    #[test]
    fn test_guard_sends_signed_in_users_home() {
        let table = routes::default_table();
        for path in ["/login", "/register", "/login?redirect=/"] {
            let target = table.resolve(path).unwrap();
            assert_eq!(guard(&target, true), GuardDecision::Redirect("/".to_string()));
        }
        let login = table.resolve("/login").unwrap();
        assert_eq!(
            guard(&login, false),
            GuardDecision::Proceed {
                title: "Cloud Drive".to_string()
            }
        );
    }

    #[test]
    fn test_guard_is_idempotent() {
        let table = routes::default_table();
        let target = table.resolve("/recycle").unwrap();
        assert_eq!(guard(&target, false), guard(&target, false));
        assert_eq!(guard(&target, true), guard(&target, true));
    }

    #[test]
    fn test_navigate_follows_redirect_and_records_location() {
        let (router, _session, titles) = router();

        let location = router.navigate("/settings").unwrap();
        assert_eq!(location.path, "/login");
        assert_eq!(location.query_value("redirect"), Some("/settings"));
        assert_eq!(router.current_path(), "/login?redirect=/settings");
        assert_eq!(*titles.seen.lock().unwrap(), vec!["Cloud Drive"]);
    }

    #[test]
    fn test_navigate_with_token() {
        let (router, session, titles) = router();
        session.set_token("t").unwrap();

        assert_eq!(router.navigate("/login").unwrap().name.as_deref(), Some("Home"));
        assert_eq!(router.navigate("/detail/9").unwrap().param("fileId"), Some("9"));
        assert_eq!(
            *titles.seen.lock().unwrap(),
            vec!["My Drive - Cloud Drive", "File Details - Cloud Drive"]
        );
    }

    #[test]
    fn test_redirect_loop_is_bounded() {
        let table = RouteTable::new(vec![RouteRecord::new(
            "/login",
            Some("Login"),
            RouteMeta {
                requires_auth: true,
                ..RouteMeta::default()
            },
        )]);
        let router = Router::new(table, Session::in_memory(), Arc::new(Titles::default()), "App");
        assert_eq!(
            router.navigate("/login"),
            Err(NavigationError::TooManyRedirects("/login".to_string()))
        );
    }

    #[test]
    fn test_no_match_without_catch_all() {
        let table = RouteTable::new(vec![RouteRecord::new("/only", None, RouteMeta::default())]);
        let router = Router::new(table, Session::in_memory(), Arc::new(Titles::default()), "App");
        assert!(matches!(router.navigate("/other"), Err(NavigationError::NoMatch(_))));
    }

    #[test]
    fn test_immediate_login_redirect() {
        let (router, session, _titles) = router();
        session.set_token("t").unwrap();
        router.navigate("/recycle").unwrap();

        session.clear().unwrap();
        router.redirect_to_login(&router.current_path(), Duration::ZERO);

        let current = router.current();
        assert_eq!(current.name.as_deref(), Some("Login"));
        assert_eq!(current.query_value("redirect"), Some("/recycle"));
    }

    #[tokio::test]
    async fn test_delayed_login_redirect() {
        let (router, _session, _titles) = router();
        router.navigate("/s/abc").unwrap();

        router.redirect_to_login("/s/abc", Duration::from_millis(20));
        assert_eq!(router.current().name.as_deref(), Some("Share"));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(router.current().name.as_deref(), Some("Login"));
    }
}
