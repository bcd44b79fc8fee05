use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder};
use handlebars::Handlebars;
use log::error;
use serde::Deserialize;
use serde_json::{json, Value};
use url::form_urlencoded;

use crate::core::error::{LibraryError, LibraryResult};
use crate::core::models::{
    Category, Novel, NovelFilter, NovelStatus, PageRequest, Pagination, SortBy,
};
use crate::web::auth::CurrentUser;
use crate::web::models::{NovelDetailQuery, NovelListQuery};
use crate::web::server::AppState;

const TEMPLATES: [(&str, &str); 16] = [
    ("index", include_str!("../templates/index.hbs")),
    ("novels", include_str!("../templates/novels.hbs")),
    ("novel", include_str!("../templates/novel.hbs")),
    ("chapter", include_str!("../templates/chapter.hbs")),
    ("categories", include_str!("../templates/categories.hbs")),
    ("rankings", include_str!("../templates/rankings.hbs")),
    ("search", include_str!("../templates/search.hbs")),
    ("dashboard", include_str!("../templates/dashboard.hbs")),
    ("admin", include_str!("../templates/admin.hbs")),
    ("admin_novels", include_str!("../templates/admin/novels.hbs")),
    ("admin_novel_form", include_str!("../templates/admin/novel_form.hbs")),
    ("admin_chapters", include_str!("../templates/admin/chapters.hbs")),
    ("admin_chapter_form", include_str!("../templates/admin/chapter_form.hbs")),
    ("admin_categories", include_str!("../templates/admin/categories.hbs")),
    ("error", include_str!("../templates/error.hbs")),
    ("404", include_str!("../templates/404.hbs")),
];

const PARTIALS: [(&str, &str); 4] = [
    ("header", include_str!("../templates/header.hbs")),
    ("footer", include_str!("../templates/footer.hbs")),
    ("novel_card", include_str!("../templates/novel_card.hbs")),
    ("admin_nav", include_str!("../templates/admin/nav.hbs")),
];

/// Shared handlebars instance
lazy_static::lazy_static! {
    static ref HBS: Arc<Handlebars<'static>> = {
        let mut hbs = Handlebars::new();
        for (name, source) in PARTIALS {
            if let Err(e) = hbs.register_partial(name, source) {
                error!("Error registering partial {}: {}", name, e);
            }
        }
        for (name, source) in TEMPLATES {
            if let Err(e) = hbs.register_template_string(name, source) {
                error!("Error registering template {}: {}", name, e);
            }
        }
        Arc::new(hbs)
    };
}

const HOME_SHELF_SIZE: u32 = 6;
const RANKING_SIZE: u32 = 10;
const SEARCH_RESULTS: u32 = 50;

pub(crate) fn render(status: StatusCode, template: &str, mut context: Value) -> HttpResponse {
    if let Value::Object(map) = &mut context {
        map.insert("version".to_string(), json!(env!("CARGO_PKG_VERSION")));
    }
    match HBS.render(template, &context) {
        Ok(body) => HttpResponse::build(status)
            .content_type("text/html; charset=utf-8")
            .body(body),
        Err(e) => {
            error!("Template rendering error: {}", e);
            HttpResponse::InternalServerError().body(format!("Template error: {}", e))
        }
    }
}

pub(crate) fn page_error(err: &LibraryError) -> HttpResponse {
    match err {
        LibraryError::NotFound(_) => not_found_page(),
        LibraryError::ValidationError(msg) => render(
            StatusCode::BAD_REQUEST,
            "error",
            json!({
                "title": "Bad request | Novel Planet",
                "heading": "Bad request",
                "message": msg,
            }),
        ),
        other => {
            error!("Page failed: {}", other);
            render(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                json!({
                    "title": "Error | Novel Planet",
                    "heading": "Something went wrong",
                    "message": "The library could not be loaded. Please try again later.",
                }),
            )
        }
    }
}

pub(crate) fn not_found_page() -> HttpResponse {
    render(
        StatusCode::NOT_FOUND,
        "404",
        json!({ "title": "Page Not Found | Novel Planet" }),
    )
}

/// Template view of a novel with the rating rounded for display
pub(crate) fn novel_card(novel: &Novel) -> Value {
    json!({
        "id": novel.id,
        "title": novel.title,
        "author": novel.author,
        "description": novel.description,
        "status": novel.status.as_str(),
        "tags": novel.tags,
        "chapter_count": novel.chapter_count,
        "word_count": novel.word_count,
        "view_count": novel.view_count,
        "favorite_count": novel.favorite_count,
        "rating": format!("{:.1}", novel.rating),
        "rating_count": novel.rating_count,
    })
}

fn novel_cards(novels: &[Novel]) -> Vec<Value> {
    novels.iter().map(novel_card).collect()
}

fn top_novels(data: &AppState, sort_by: SortBy, limit: u32) -> LibraryResult<Vec<Novel>> {
    let filter = NovelFilter {
        sort_by,
        ..Default::default()
    };
    Ok(data
        .db
        .list_novels(&filter, PageRequest::new(1, limit))?
        .novels)
}

/// Serve the index/home page
pub async fn index(data: web::Data<AppState>) -> impl Responder {
    let shelves = top_novels(&data, SortBy::Popular, HOME_SHELF_SIZE).and_then(|popular| {
        let latest = top_novels(&data, SortBy::Latest, HOME_SHELF_SIZE)?;
        let categories = data.db.list_categories()?;
        Ok((popular, latest, categories))
    });

    match shelves {
        Ok((popular, latest, categories)) => render(
            StatusCode::OK,
            "index",
            json!({
                "title": "Novel Planet",
                "popular": novel_cards(&popular),
                "latest": novel_cards(&latest),
                "categories": categories,
            }),
        ),
        Err(e) => page_error(&e),
    }
}

/// Listing URL for another page; every active filter is carried over
pub(crate) fn listing_link(base: &str, filter: &NovelFilter, limit: u32, page: u32) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("page", &page.to_string());
    query.append_pair("limit", &limit.to_string());
    if let Some(category_id) = &filter.category_id {
        query.append_pair("category_id", category_id);
    }
    if let Some(status) = filter.status {
        query.append_pair("status", status.as_str());
    }
    if let Some(search) = &filter.search {
        query.append_pair("search", search);
    }
    query.append_pair("sort_by", filter.sort_by.as_str());
    format!("{}?{}", base, query.finish())
}

pub(crate) fn pager_links(
    base: &str,
    filter: &NovelFilter,
    pagination: &Pagination,
) -> (Option<String>, Option<String>) {
    let link = |page| listing_link(base, filter, pagination.limit, page);
    let prev = (pagination.page > 1).then(|| link(pagination.page - 1));
    let next = ((pagination.page as u64) < pagination.total_pages).then(|| link(pagination.page + 1));
    (prev, next)
}

/// Serve the library listing page
pub async fn novels(
    data: web::Data<AppState>,
    query: web::Query<NovelListQuery>,
) -> impl Responder {
    let listing = query.filter().and_then(|filter| {
        let list = data.db.list_novels(&filter, query.page_request())?;
        let categories = data.db.list_categories()?;
        Ok((filter, list, categories))
    });
    let (filter, list, categories) = match listing {
        Ok(listing) => listing,
        Err(e) => return page_error(&e),
    };

    let category_options: Vec<Value> = categories
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "selected": filter.category_id.as_deref() == Some(c.id.as_str()),
            })
        })
        .collect();
    let statuses: Vec<Value> = [NovelStatus::Ongoing, NovelStatus::Completed, NovelStatus::Paused]
        .iter()
        .map(|s| json!({ "value": s.as_str(), "label": s.as_str(), "selected": filter.status == Some(*s) }))
        .collect();
    let sorts: Vec<Value> = [
        (SortBy::Latest, "Recently updated"),
        (SortBy::Popular, "Most read"),
        (SortBy::Rating, "Highest rated"),
    ]
    .iter()
    .map(|(s, label)| json!({ "value": s.as_str(), "label": label, "selected": filter.sort_by == *s }))
    .collect();
    let (prev_link, next_link) = pager_links("/novels", &filter, &list.pagination);

    render(
        StatusCode::OK,
        "novels",
        json!({
            "title": "Library | Novel Planet",
            "novels": novel_cards(&list.novels),
            "categories": category_options,
            "statuses": statuses,
            "sorts": sorts,
            "search": filter.search,
            "limit": list.pagination.limit,
            "total": list.pagination.total,
            "page": list.pagination.page,
            "total_pages": list.pagination.total_pages.max(1),
            "prev_link": prev_link,
            "next_link": next_link,
        }),
    )
}

/// Serve a novel's contents page
pub async fn novel(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<NovelDetailQuery>,
) -> impl Responder {
    let page = PageRequest::new(query.page, query.page_size);
    let loaded = data.db.novel_detail(&path, page).and_then(|detail| {
        let categories = data.db.list_categories()?;
        Ok((detail, categories))
    });
    let (detail, categories) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => return page_error(&e),
    };

    let category: Option<&Category> = detail
        .novel
        .category_id
        .as_deref()
        .and_then(|id| categories.iter().find(|c| c.id == id));
    let shown = (page.page as u64 - 1) * page.limit as u64 + detail.chapters.len() as u64;
    let prev_page = (page.page > 1).then(|| page.page - 1);
    let next_page = (shown < detail.novel.chapter_count as u64).then(|| page.page + 1);

    render(
        StatusCode::OK,
        "novel",
        json!({
            "title": format!("{} | Novel Planet", detail.novel.title),
            "novel": novel_card(&detail.novel),
            "category": category,
            "chapters": detail.chapters,
            "prev_page": prev_page,
            "next_page": next_page,
        }),
    )
}

/// Serve the chapter reader; each visit counts as a read
pub async fn chapter(
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

    let chapter = match data.chapters.chapter_content(&chapter_id).await {
        Ok(chapter) => chapter,
        Err(e) => return page_error(&e),
    };
    let paragraphs: Vec<&str> = chapter
        .content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    render(
        StatusCode::OK,
        "chapter",
        json!({
            "title": format!("{} | {}", chapter.title, novel.title),
            "novel": { "id": novel.id, "title": novel.title },
            "chapter": chapter,
            "paragraphs": paragraphs,
        }),
    )
}

/// Serve the category overview
pub async fn categories(data: web::Data<AppState>) -> impl Responder {
    match data.db.list_categories() {
        Ok(categories) => render(
            StatusCode::OK,
            "categories",
            json!({
                "title": "Categories | Novel Planet",
                "categories": categories,
            }),
        ),
        Err(e) => page_error(&e),
    }
}

fn ranking_board(label: &str, novels: &[Novel], score: impl Fn(&Novel) -> String) -> Value {
    let entries: Vec<Value> = novels
        .iter()
        .map(|n| {
            json!({
                "id": n.id,
                "title": n.title,
                "author": n.author,
                "score": score(n),
            })
        })
        .collect();
    json!({ "label": label, "novels": entries })
}

/// Serve the rankings page
pub async fn rankings(data: web::Data<AppState>) -> impl Responder {
    let boards = top_novels(&data, SortBy::Popular, RANKING_SIZE).and_then(|popular| {
        let rated = top_novels(&data, SortBy::Rating, RANKING_SIZE)?;
        let latest = top_novels(&data, SortBy::Latest, RANKING_SIZE)?;
        Ok(vec![
            ranking_board("Most read", &popular, |n| format!("{} views", n.view_count)),
            ranking_board("Highest rated", &rated, |n| format!("{:.1} stars", n.rating)),
            ranking_board("Recently updated", &latest, |n| {
                n.updated_at.format("%Y-%m-%d").to_string()
            }),
        ])
    });

    match boards {
        Ok(boards) => render(
            StatusCode::OK,
            "rankings",
            json!({
                "title": "Rankings | Novel Planet",
                "boards": boards,
            }),
        ),
        Err(e) => page_error(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Serve title search results
pub async fn search(data: web::Data<AppState>, query: web::Query<SearchQuery>) -> impl Responder {
    let term = query.q.trim();
    if term.is_empty() {
        return render(
            StatusCode::OK,
            "search",
            json!({ "title": "Search | Novel Planet" }),
        );
    }

    let filter = NovelFilter {
        search: Some(term.to_string()),
        ..Default::default()
    };
    match data.db.list_novels(&filter, PageRequest::new(1, SEARCH_RESULTS)) {
        Ok(list) => render(
            StatusCode::OK,
            "search",
            json!({
                "title": format!("{} | Search | Novel Planet", term),
                "query": term,
                "total": list.pagination.total,
                "novels": novel_cards(&list.novels),
            }),
        ),
        Err(e) => page_error(&e),
    }
}

/// Serve the back-office dashboard
pub async fn admin(data: web::Data<AppState>) -> impl Responder {
    match data.db.admin_stats() {
        Ok(stats) => {
            let recent: Vec<Value> = stats
                .recent_novels
                .iter()
                .map(|n| {
                    json!({
                        "id": n.id,
                        "title": n.title,
                        "author": n.author,
                        "chapter_count": n.chapter_count,
                        "created": n.created_at.format("%Y-%m-%d").to_string(),
                    })
                })
                .collect();
            render(
                StatusCode::OK,
                "admin",
                json!({
                    "title": "Admin | Novel Planet",
                    "stats": stats,
                    "recent": recent,
                }),
            )
        }
        Err(e) => page_error(&e),
    }
}

const DASHBOARD_SIZE: u32 = 20;

/// Serve the reader dashboard for the signed-in user
pub async fn dashboard(user: Option<CurrentUser>, data: web::Data<AppState>) -> impl Responder {
    let user = match user {
        Some(user) => user,
        None => {
            return render(
                StatusCode::UNAUTHORIZED,
                "error",
                json!({
                    "title": "Sign in required | Novel Planet",
                    "heading": "Sign in required",
                    "message": "Sign in to see your reading dashboard.",
                }),
            )
        }
    };

    let page = PageRequest::new(1, DASHBOARD_SIZE);
    let shelves = data.db.user_favorites(&user.id, page).and_then(|favorites| {
        let history = data.db.reading_history(&user.id, page)?;
        let bookmarks = data.db.user_bookmarks(&user.id, None, page)?;
        Ok((favorites, history, bookmarks))
    });
    let (favorites, history, bookmarks) = match shelves {
        Ok(shelves) => shelves,
        Err(e) => return page_error(&e),
    };

    let favorite_cards: Vec<Value> = favorites
        .favorites
        .iter()
        .map(|entry| novel_card(&entry.novel))
        .collect();
    let history_rows: Vec<Value> = history
        .history
        .iter()
        .map(|entry| {
            json!({
                "novel": { "id": entry.novel.id, "title": entry.novel.title },
                "chapter": entry.chapter,
                "progress": format!("{:.0}%", entry.progress * 100.0),
                "last_read": entry.last_read_at.format("%Y-%m-%d %H:%M").to_string(),
            })
        })
        .collect();
    let bookmark_rows: Vec<Value> = bookmarks
        .bookmarks
        .iter()
        .map(|entry| {
            json!({
                "novel": entry.novel,
                "chapter": entry.chapter,
                "note": entry.bookmark.note,
                "created": entry.bookmark.created_at.format("%Y-%m-%d").to_string(),
            })
        })
        .collect();

    render(
        StatusCode::OK,
        "dashboard",
        json!({
            "title": "My shelf | Novel Planet",
            "user": user.id,
            "favorites": favorite_cards,
            "favorite_total": favorites.pagination.total,
            "history": history_rows,
            "bookmarks": bookmark_rows,
        }),
    )
}

/// Serve the 404 page
pub async fn not_found() -> impl Responder {
    not_found_page()
}
