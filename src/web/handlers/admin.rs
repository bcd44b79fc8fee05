//! Back-office pages. Forms submit to the JSON API through `static/admin.js`,
//! so every write goes through the same validation and sign-in checks.

use actix_web::http::StatusCode;
use actix_web::{web, Responder};
use serde_json::{json, Value};

use crate::core::models::{Category, Chapter, Novel, NovelStatus, PageRequest};
use crate::web::handlers::pages::{not_found_page, page_error, pager_links, render};
use crate::web::models::{NovelDetailQuery, NovelListQuery};
use crate::web::server::AppState;

const STATUSES: [NovelStatus; 3] = [
    NovelStatus::Ongoing,
    NovelStatus::Completed,
    NovelStatus::Paused,
];

fn status_options(selected: Option<NovelStatus>) -> Vec<Value> {
    STATUSES
        .iter()
        .map(|s| json!({ "value": s.as_str(), "selected": selected == Some(*s) }))
        .collect()
}

fn category_options(categories: &[Category], selected: Option<&str>) -> Vec<Value> {
    categories
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "selected": selected == Some(c.id.as_str()),
            })
        })
        .collect()
}

/// Novel table with search and paging
pub async fn novels(
    data: web::Data<AppState>,
    query: web::Query<NovelListQuery>,
) -> impl Responder {
    let listing = query
        .filter()
        .and_then(|filter| Ok((data.db.list_novels(&filter, query.page_request())?, filter)));
    let (list, filter) = match listing {
        Ok(listing) => listing,
        Err(e) => return page_error(&e),
    };

    let rows: Vec<Value> = list
        .novels
        .iter()
        .map(|n| {
            json!({
                "id": n.id,
                "title": n.title,
                "author": n.author,
                "status": n.status.as_str(),
                "chapter_count": n.chapter_count,
                "view_count": n.view_count,
                "updated": n.updated_at.format("%Y-%m-%d").to_string(),
            })
        })
        .collect();
    let (prev_link, next_link) = pager_links("/admin/novels", &filter, &list.pagination);

    render(
        StatusCode::OK,
        "admin_novels",
        json!({
            "title": "Novels | Admin | Novel Planet",
            "novels": rows,
            "search": filter.search,
            "total": list.pagination.total,
            "page": list.pagination.page,
            "total_pages": list.pagination.total_pages.max(1),
            "prev_link": prev_link,
            "next_link": next_link,
        }),
    )
}

fn novel_form(novel: Option<&Novel>, categories: &[Category]) -> Value {
    let (title, method, action) = match novel {
        Some(n) => (format!("Edit {}", n.title), "PUT", format!("/api/novels/{}", n.id)),
        None => ("New novel".to_string(), "POST", "/api/novels".to_string()),
    };
    json!({
        "title": format!("{} | Admin | Novel Planet", title),
        "heading": title,
        "method": method,
        "action": action,
        "novel": novel,
        "tags": novel.map(|n| n.tags.join(", ")),
        "categories": category_options(categories, novel.and_then(|n| n.category_id.as_deref())),
        "statuses": status_options(Some(novel.map(|n| n.status).unwrap_or_default())),
    })
}

pub async fn new_novel(data: web::Data<AppState>) -> impl Responder {
    match data.db.list_categories() {
        Ok(categories) => render(StatusCode::OK, "admin_novel_form", novel_form(None, &categories)),
        Err(e) => page_error(&e),
    }
}

pub async fn edit_novel(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let loaded = data.db.get_novel(&path).and_then(|novel| {
        let categories = data.db.list_categories()?;
        Ok((novel, categories))
    });
    match loaded {
        Ok((novel, categories)) => {
            render(StatusCode::OK, "admin_novel_form", novel_form(Some(&novel), &categories))
        }
        Err(e) => page_error(&e),
    }
}

/// A novel's chapter table
pub async fn novel_chapters(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<NovelDetailQuery>,
) -> impl Responder {
    let page = PageRequest::new(query.page, query.page_size);
    let detail = match data.db.novel_detail(&path, page) {
        Ok(detail) => detail,
        Err(e) => return page_error(&e),
    };

    let chapters: Vec<Value> = detail
        .chapters
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "chapter_number": c.chapter_number,
                "title": c.title,
                "word_count": c.word_count,
                "is_free": c.is_free,
                "published": c.published_at.map(|t| t.format("%Y-%m-%d").to_string()),
            })
        })
        .collect();
    let shown = (page.page as u64 - 1) * page.limit as u64 + detail.chapters.len() as u64;

    render(
        StatusCode::OK,
        "admin_chapters",
        json!({
            "title": format!("{} | Admin | Novel Planet", detail.novel.title),
            "novel": detail.novel,
            "chapters": chapters,
            "prev_page": (page.page > 1).then(|| page.page - 1),
            "next_page": (shown < detail.novel.chapter_count as u64).then(|| page.page + 1),
        }),
    )
}

fn chapter_form(novel: &Novel, chapter: Option<&Chapter>) -> Value {
    let (heading, method, action) = match chapter {
        Some(c) => (
            format!("Edit chapter {}", c.chapter_number),
            "PUT",
            format!("/api/chapters/{}", c.id),
        ),
        None => ("New chapter".to_string(), "POST", "/api/chapters".to_string()),
    };
    json!({
        "title": format!("{} | {} | Admin | Novel Planet", heading, novel.title),
        "heading": heading,
        "method": method,
        "action": action,
        "novel": { "id": novel.id, "title": novel.title },
        "chapter_number": chapter.map(|c| c.chapter_number).unwrap_or(novel.chapter_count + 1),
        "chapter_title": chapter.map(|c| c.title.as_str()),
        "content": chapter.map(|c| c.content.as_str()),
        "is_free": chapter.map(|c| c.is_free).unwrap_or(true),
    })
}

pub async fn new_chapter(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match data.db.get_novel(&path) {
        Ok(novel) => render(StatusCode::OK, "admin_chapter_form", chapter_form(&novel, None)),
        Err(e) => page_error(&e),
    }
}

/// Chapter editor; the body is loaded without counting a read
pub async fn edit_chapter(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (novel_id, chapter_id) = path.into_inner();
    let novel = match data.db.get_novel(&novel_id) {
        Ok(novel) => novel,
        Err(e) => return page_error(&e),
    };
    match data.db.find_chapter(&chapter_id) {
        Ok(Some(chapter)) if chapter.novel_id == novel.id => {}
        Ok(_) => return not_found_page(),
        Err(e) => return page_error(&e),
    }

    match data.chapters.chapter_detail(&chapter_id).await {
        Ok(chapter) => render(
            StatusCode::OK,
            "admin_chapter_form",
            chapter_form(&novel, Some(&chapter)),
        ),
        Err(e) => page_error(&e),
    }
}

pub async fn categories(data: web::Data<AppState>) -> impl Responder {
    match data.db.list_categories() {
        Ok(categories) => render(
            StatusCode::OK,
            "admin_categories",
            json!({
                "title": "Categories | Admin | Novel Planet",
                "categories": categories,
            }),
        ),
        Err(e) => page_error(&e),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};

    use crate::core::database::test_support as db_support;
    use crate::core::models::NewChapter;
    use crate::web::server::{routes, test_support};

    macro_rules! get_html {
        ($app:expr, $uri:expr) => {{
            let req = test::TestRequest::get().uri($uri).to_request();
            let resp = test::call_service(&$app, req).await;
            let status = resp.status().as_u16();
            let bytes = test::read_body(resp).await;
            (status, String::from_utf8(bytes.to_vec()).unwrap())
        }};
    }

    #[actix_web::test]
    async fn test_novel_table_and_forms() {
        let state = test_support::state();
        let category = db_support::category(&state.db, "Xianxia");
        let novel = db_support::novel(&state.db, "Cloud Sea", Some(&category));
        db_support::novel(&state.db, "Desert Wind", None);
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

        let (status, html) = get_html!(app, "/admin/novels?search=cloud");
        assert_eq!(status, 200);
        assert!(html.contains("Cloud Sea"));
        assert!(!html.contains("Desert Wind"));
        assert!(html.contains("/static/admin.js"));

        let (status, html) = get_html!(app, "/admin/novels/create");
        assert_eq!(status, 200);
        assert!(html.contains("data-method=\"POST\""));
        assert!(html.contains("Xianxia"));

        let (status, html) = get_html!(app, &format!("/admin/novels/{}/edit", novel.id));
        assert_eq!(status, 200);
        assert!(html.contains("data-method=\"PUT\""));
        assert!(html.contains("value=\"Cloud Sea\""));
        assert!(html.contains(&format!("value=\"{}\" selected", category)));

        let (status, _) = get_html!(app, "/admin/novels/missing/edit");
        assert_eq!(status, 404);
    }

    #[actix_web::test]
    async fn test_chapter_table_and_editor() {
        let state = test_support::state();
        let novel = db_support::novel(&state.db, "Iron Oath", None);
        let other = db_support::novel(&state.db, "Paper Crane", None);
        let chapter = state
            .chapters
            .create_chapter(&NewChapter {
                novel_id: novel.id.clone(),
                chapter_number: 1,
                title: "The Forge".to_string(),
                content: "Sparks flew.".to_string(),
                is_free: true,
            })
            .await
            .unwrap();
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

        let (status, html) = get_html!(app, &format!("/admin/novels/{}", novel.id));
        assert_eq!(status, 200);
        assert!(html.contains("The Forge"));

        let (status, html) =
            get_html!(app, &format!("/admin/novels/{}/chapters/create", novel.id));
        assert_eq!(status, 200);
        assert!(html.contains("name=\"chapter_number\" value=\"2\""));

        let uri = format!("/admin/novels/{}/chapters/{}/edit", novel.id, chapter.id);
        let (status, html) = get_html!(app, &uri);
        assert_eq!(status, 200);
        assert!(html.contains("Sparks flew."));
        assert_eq!(state.db.get_chapter(&chapter.id).unwrap().view_count, 0);

        let uri = format!("/admin/novels/{}/chapters/{}/edit", other.id, chapter.id);
        let (status, _) = get_html!(app, &uri);
        assert_eq!(status, 404);
    }

    #[actix_web::test]
    async fn test_category_management_page() {
        let state = test_support::state();
        let id = db_support::category(&state.db, "Mystery");
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

        let (status, html) = get_html!(app, "/admin/categories");
        assert_eq!(status, 200);
        assert!(html.contains("Mystery"));
        assert!(html.contains(&format!("/api/categories/{}", id)));
    }
}
