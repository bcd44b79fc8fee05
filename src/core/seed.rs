//! Sample catalogue for fresh installations.

use chrono::Utc;
use log::info;
use rusqlite::params;

use crate::core::database::{to_db_time, Database};
use crate::core::error::LibraryResult;
use crate::core::models::{CategoryInput, NewNovel, NovelStatus};

struct SampleNovel {
    title: &'static str,
    author: &'static str,
    category: usize,
    description: &'static str,
    status: NovelStatus,
    tags: &'static [&'static str],
    view_count: i64,
    favorite_count: i64,
    rating: f64,
    rating_count: i64,
}

const CATEGORIES: [(&str, &str); 6] = [
    ("Fantasy", "Cultivation, magic and other worlds"),
    ("Urban", "Modern city life"),
    ("History", "Stories set in past dynasties"),
    ("Science Fiction", "Space, machines and the future"),
    ("Wuxia", "Martial heroes and the jianghu"),
    ("Romance", "Love stories"),
];

const NOVELS: [SampleNovel; 4] = [
    SampleNovel {
        title: "Battle Through the Heavens",
        author: "Tian Can Tu Dou",
        category: 0,
        description: "A continent of Dou Qi where strength is everything.",
        status: NovelStatus::Completed,
        tags: &["fantasy", "action", "cultivation"],
        view_count: 1_000_000,
        favorite_count: 50_000,
        rating: 4.5,
        rating_count: 10_000,
    },
    SampleNovel {
        title: "The King's Avatar",
        author: "Butterfly Blue",
        category: 1,
        description: "A top esports player is forced out of his club and starts over.",
        status: NovelStatus::Completed,
        tags: &["esports", "urban"],
        view_count: 800_000,
        favorite_count: 40_000,
        rating: 4.7,
        rating_count: 8_000,
    },
    SampleNovel {
        title: "Ming Dynasty Chronicles",
        author: "Dang Nian Ming Yue",
        category: 2,
        description: "Three hundred years of the Ming told as a story.",
        status: NovelStatus::Completed,
        tags: &["history"],
        view_count: 500_000,
        favorite_count: 20_000,
        rating: 4.8,
        rating_count: 6_000,
    },
    SampleNovel {
        title: "Starship Dawn",
        author: "Lin Qing",
        category: 3,
        description: "The last colony ship wakes up three centuries late.",
        status: NovelStatus::Ongoing,
        tags: &["space", "survival"],
        view_count: 12_000,
        favorite_count: 900,
        rating: 4.1,
        rating_count: 150,
    },
];

/// Insert the sample catalogue unless categories already exist.
///
/// Returns whether anything was written.
pub fn seed_if_empty(db: &Database) -> LibraryResult<bool> {
    if db.category_count()? > 0 {
        info!("Catalogue already populated, skipping seed data");
        return Ok(false);
    }

    let mut category_ids = Vec::with_capacity(CATEGORIES.len());
    for (name, description) in CATEGORIES {
        let category = db.create_category(&CategoryInput {
            name: name.to_string(),
            description: Some(description.to_string()),
        })?;
        category_ids.push(category.id);
    }

    let now = to_db_time(&Utc::now());
    for sample in &NOVELS {
        let novel = db.create_novel(&NewNovel {
            title: sample.title.to_string(),
            author: sample.author.to_string(),
            category_id: Some(category_ids[sample.category].clone()),
            cover_image: None,
            description: Some(sample.description.to_string()),
            status: sample.status,
            tags: Some(sample.tags.iter().map(|t| t.to_string()).collect()),
        })?;

        db.execute_raw(
            "UPDATE novel SET view_count = ?1, favorite_count = ?2, rating = ?3,
                              rating_count = ?4, is_recommended = 1, published_at = ?5
             WHERE id = ?6",
            params![
                sample.view_count,
                sample.favorite_count,
                sample.rating,
                sample.rating_count,
                now,
                novel.id
            ],
        )?;
    }

    info!(
        "Seeded {} categories and {} novels",
        CATEGORIES.len(),
        NOVELS.len()
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{NovelFilter, PageRequest, SortBy};

    #[test]
    fn test_seed_runs_once() {
        let db = Database::open_in_memory().unwrap();
        assert!(seed_if_empty(&db).unwrap());
        assert!(!seed_if_empty(&db).unwrap());

        assert_eq!(db.list_categories().unwrap().len(), CATEGORIES.len());
        let popular = NovelFilter {
            sort_by: SortBy::Popular,
            ..Default::default()
        };
        let list = db.list_novels(&popular, PageRequest::default()).unwrap();
        assert_eq!(list.pagination.total, NOVELS.len() as u64);
        assert_eq!(list.novels[0].title, "Battle Through the Heavens");
        assert!(list.novels.iter().all(|n| n.is_recommended));
    }
}
