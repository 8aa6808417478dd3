//! 备份/恢复引擎端到端测试
//!
//! 使用内存 SQLite + 真实迁移 + 进程内图片缓存，覆盖导出/导入的
//! 往返、引用完整性、悬挂引用丢弃、原子性、图片失败容忍、
//! 分批边界与上传校验。

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use media_vault_lib::backup::archive::{read_archive, DATA_ENTRY_NAME, MANIFEST_ENTRY_NAME};
use media_vault_lib::backup::document::{
    ApiCredentialData, BackupDocument, BackupMetadata, GameData, UserGameData, UserProfileData,
    ARCHIVE_FORMAT_VERSION,
};
use media_vault_lib::backup::export::build_backup;
use media_vault_lib::backup::image_cache::{
    cache_filename, CacheRestoreSummary, CacheStats, CachedImage, ImageCache, ImageCacheError,
    MemoryImageCache,
};
use media_vault_lib::backup::progress::{BackupProgress, ProgressSink};
use media_vault_lib::backup::{archive, BackupError};
use media_vault_lib::database::dto::{
    InsertCredentialData, InsertGameData, InsertMovieData, InsertUserData, InsertUserGameData,
    InsertUserMovieData,
};
use media_vault_lib::database::repository::{
    credentials_repository::CredentialsRepository, games_repository::GamesRepository,
    movies_repository::MoviesRepository, users_repository::UsersRepository,
};
use media_vault_lib::database::{cache_stats, import_backup, BackupFailure};
use media_vault_lib::entity::url_list::UrlList;
use migration::{Migrator, MigratorTrait};
use parking_lot::Mutex;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

// ==================== 测试基础设施 ====================

async fn setup_db() -> DatabaseConnection {
    // 单连接池：保证所有操作看到同一个内存数据库
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1);
    options.sqlx_logging(false);

    let db = Database::connect(options).await.expect("连接内存数据库失败");
    Migrator::up(&db, None).await.expect("执行迁移失败");
    db
}

async fn create_account(db: &DatabaseConnection, email: &str) -> i64 {
    UsersRepository::insert(
        db,
        InsertUserData {
            email: email.to_string(),
            password_hash: "argon2id$fake".to_string(),
            first_name: Some("三".to_string()),
            last_name: Some("张".to_string()),
            avatar_url: Some("https://img.example.com/avatar.png".to_string()),
            timezone: Some("Asia/Shanghai".to_string()),
            theme_preference: Some("dark".to_string()),
        },
    )
    .await
    .expect("创建账号失败")
}

/// 为账号播种一份小而全的媒体库：两款游戏、一部电影、三条库记录、一份凭据
async fn seed_library(db: &DatabaseConnection, user_id: i64) {
    let game_a = GamesRepository::insert(
        db,
        InsertGameData {
            title: "空洞骑士".to_string(),
            cover_url: Some("https://img.example.com/hk-cover.jpg".to_string()),
            banner_url: Some("https://img.example.com/hk-banner.jpg".to_string()),
            screenshot_urls: Some(UrlList(vec![
                "https://img.example.com/hk-s1.jpg".to_string(),
                "https://img.example.com/hk-s2.jpg".to_string(),
            ])),
            developer: Some("Team Cherry".to_string()),
            release_date: Some("2017-02-24".to_string()),
            summary: None,
        },
    )
    .await
    .unwrap();

    let game_b = GamesRepository::insert(
        db,
        InsertGameData {
            title: "极乐迪斯科".to_string(),
            cover_url: Some("https://img.example.com/de-cover.jpg".to_string()),
            banner_url: None,
            screenshot_urls: None,
            developer: Some("ZA/UM".to_string()),
            release_date: Some("2019-10-15".to_string()),
            summary: None,
        },
    )
    .await
    .unwrap();

    let movie = MoviesRepository::insert(
        db,
        InsertMovieData {
            title: "银翼杀手 2049".to_string(),
            cover_url: Some("https://img.example.com/br-poster.jpg".to_string()),
            backdrop_url: Some("https://img.example.com/br-backdrop.jpg".to_string()),
            artwork_urls: None,
            director: Some("Denis Villeneuve".to_string()),
            release_date: Some("2017-10-06".to_string()),
            summary: None,
        },
    )
    .await
    .unwrap();

    GamesRepository::insert_user_game(
        db,
        InsertUserGameData {
            user_id,
            game_id: game_a,
            status: "playing".to_string(),
            rating: Some(9.5),
            notes: Some("白宫低语者".to_string()),
            platform: Some("PC".to_string()),
        },
    )
    .await
    .unwrap();

    GamesRepository::insert_user_game(
        db,
        InsertUserGameData {
            user_id,
            game_id: game_b,
            status: "backlog".to_string(),
            rating: None,
            notes: None,
            platform: Some("Switch".to_string()),
        },
    )
    .await
    .unwrap();

    MoviesRepository::insert_user_movie(
        db,
        InsertUserMovieData {
            user_id,
            movie_id: movie,
            status: "watched".to_string(),
            rating: Some(8.0),
            notes: None,
        },
    )
    .await
    .unwrap();

    CredentialsRepository::insert(
        db,
        InsertCredentialData {
            user_id,
            provider: "igdb".to_string(),
            api_key: Some("key-123".to_string()),
            access_token: Some("token-abc".to_string()),
            refresh_token: None,
            expires_at: Some(1_900_000_000),
            is_active: 1,
        },
    )
    .await
    .unwrap();
}

/// 覆盖播种数据全部图片 URL 的缓存数据源
fn seeded_image_source() -> HashMap<String, Vec<u8>> {
    [
        "https://img.example.com/avatar.png",
        "https://img.example.com/hk-cover.jpg",
        "https://img.example.com/hk-banner.jpg",
        "https://img.example.com/hk-s1.jpg",
        "https://img.example.com/hk-s2.jpg",
        "https://img.example.com/de-cover.jpg",
        "https://img.example.com/br-poster.jpg",
        "https://img.example.com/br-backdrop.jpg",
    ]
    .into_iter()
    .map(|url| (url.to_string(), url.as_bytes().to_vec()))
    .collect()
}

fn sample_metadata() -> BackupMetadata {
    BackupMetadata {
        version: ARCHIVE_FORMAT_VERSION.to_string(),
        created: "2026-03-15T00:00:00+00:00".to_string(),
        total_games: 1,
        total_movies: 0,
        user_games_count: 2,
        user_movies_count: 0,
        total_images: 0,
    }
}

fn sample_profile(email: &str) -> UserProfileData {
    UserProfileData {
        id: 42,
        email: email.to_string(),
        first_name: Some("四".to_string()),
        last_name: Some("李".to_string()),
        avatar_url: None,
        timezone: Some("UTC".to_string()),
        theme_preference: Some("light".to_string()),
        created_at: Some(1),
        updated_at: Some(1),
    }
}

fn sample_game_data(id: i64, title: &str) -> GameData {
    GameData {
        id,
        title: title.to_string(),
        cover_url: None,
        banner_url: None,
        screenshot_urls: vec![],
        developer: None,
        release_date: None,
        summary: None,
        created_at: Some(1),
        updated_at: Some(1),
    }
}

fn sample_user_game(id: i64, game_id: i64) -> UserGameData {
    UserGameData {
        id,
        user_id: 42,
        game_id,
        status: "backlog".to_string(),
        rating: None,
        notes: None,
        platform: None,
        created_at: Some(1),
        updated_at: Some(1),
    }
}

fn empty_document(email: &str) -> BackupDocument {
    BackupDocument {
        metadata: Some(sample_metadata()),
        user: Some(sample_profile(email)),
        games: vec![],
        movies: vec![],
        user_games: vec![],
        user_movies: vec![],
        api_credentials: vec![],
    }
}

// ==================== 往返与引用完整性 ====================

#[tokio::test]
async fn export_then_import_round_trip() {
    let db = setup_db().await;
    let user_id = create_account(&db, "user@example.com").await;
    seed_library(&db, user_id).await;

    let cache: Arc<dyn ImageCache> = Arc::new(MemoryImageCache::with_source(seeded_image_source()));

    // 通过可选回调收集进度通知
    let events: Arc<Mutex<Vec<BackupProgress>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_events = events.clone();
    let sink = move |p: BackupProgress| sink_events.lock().push(p);
    let sink: &ProgressSink = &sink;

    let payload = build_backup(&db, &cache, user_id, Some(sink)).await.unwrap();
    assert_eq!(payload.content_type, "application/zip");
    assert!(payload.filename.starts_with("media-vault-backup-"));
    assert!(payload.failed_urls.is_empty());

    {
        let events = events.lock();
        assert_eq!(events[0].stage, "data-fetch");
        assert_eq!(events[1].stage, "image-collection");
        let caching: Vec<_> = events.iter().filter(|e| e.stage == "image-caching").collect();
        assert!(!caching.is_empty());
        assert_eq!(caching.last().unwrap().current, 8);
        assert_eq!(caching.last().unwrap().total, 8);
        let last = events.last().unwrap();
        assert_eq!(last.stage, "complete");
        assert_eq!(last.percent, 100.0);
    }

    let stats = cache_stats(&cache).await.unwrap();
    assert_eq!(stats.count, 8);
    assert!(stats.total_size > 0);

    // 导出前的游戏目录 ID，用于验证恢复后 ID 被重新分配
    let old_game_ids: BTreeSet<i64> = GamesRepository::find_all(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.id)
        .collect();

    let report = import_backup(&db, &cache, user_id, &payload.bytes)
        .await
        .expect("导入应当成功");

    assert_eq!(report.games_restored, 2);
    assert_eq!(report.movies_restored, 1);
    assert_eq!(report.user_games_restored, 2);
    assert_eq!(report.user_movies_restored, 1);
    assert_eq!(report.credentials_restored, 1);
    assert_eq!(report.entries_skipped, 0);
    assert!(report.image_restore_error.is_none());

    // 库记录与凭据数量不变
    assert_eq!(GamesRepository::count_user_games(&db, user_id).await.unwrap(), 2);
    assert_eq!(MoviesRepository::count_user_movies(&db, user_id).await.unwrap(), 1);

    let credentials = CredentialsRepository::find_by_user(&db, user_id).await.unwrap();
    assert_eq!(credentials.len(), 1);
    let igdb = CredentialsRepository::find_by_user_and_provider(&db, user_id, "igdb")
        .await
        .unwrap()
        .expect("igdb 凭据应当被恢复");
    assert_eq!(igdb.api_key.as_deref(), Some("key-123"));
    assert_eq!(igdb.is_active, 1);

    // 账号资料标量字段不变
    let user = UsersRepository::find_by_id(&db, user_id).await.unwrap().unwrap();
    assert_eq!(user.email, "user@example.com");
    assert_eq!(user.first_name.as_deref(), Some("三"));
    assert_eq!(user.theme_preference.as_deref(), Some("dark"));

    // 媒体内容保留，但 ID 重新分配
    let games = GamesRepository::find_all(&db).await.unwrap();
    let titles: BTreeSet<String> = games.iter().map(|g| g.title.clone()).collect();
    assert!(titles.contains("空洞骑士"));
    assert!(titles.contains("极乐迪斯科"));
    for game in &games {
        assert!(!old_game_ids.contains(&game.id), "目录 ID 不应跨恢复保留");
    }

    // 引用完整性：每条库记录都指向存在的目录条目
    for (entry, game) in GamesRepository::find_user_games_with_games(&db, user_id)
        .await
        .unwrap()
    {
        assert!(game.is_some(), "库记录 {} 引用了不存在的游戏", entry.id);
    }
    for (entry, movie) in MoviesRepository::find_user_movies_with_movies(&db, user_id)
        .await
        .unwrap()
    {
        assert!(movie.is_some(), "库记录 {} 引用了不存在的电影", entry.id);
    }
}

#[tokio::test]
async fn archive_includes_previously_cached_images() {
    let db = setup_db().await;
    let user_id = create_account(&db, "user@example.com").await;
    seed_library(&db, user_id).await;

    let cache: Arc<dyn ImageCache> = Arc::new(MemoryImageCache::with_source(seeded_image_source()));

    // 此前运行留下的缓存条目，不被当前数据图引用
    cache
        .restore(vec![CachedImage {
            filename: "stale-cover.jpg".to_string(),
            bytes: vec![1, 2, 3],
        }])
        .await
        .unwrap();

    let payload = build_backup(&db, &cache, user_id, None).await.unwrap();
    let parsed = read_archive(&payload.bytes).unwrap();

    // 档案收录缓存全集：8 个引用图片 + 1 个历史条目
    assert_eq!(parsed.images.len(), 9);
    assert!(parsed
        .images
        .iter()
        .any(|image| image.filename == "stale-cover.jpg"));
}

// ==================== 悬挂引用丢弃 ====================

#[tokio::test]
async fn dangling_library_entries_are_dropped() {
    let db = setup_db().await;
    let user_id = create_account(&db, "user@example.com").await;

    let mut document = empty_document("restored@example.com");
    document.games = vec![sample_game_data(10, "传送门 2")];
    document.user_games = vec![
        sample_user_game(1, 10),
        // 引用档案中不存在的游戏 999
        sample_user_game(2, 999),
    ];

    let bytes = archive::write_archive(&document, "manifest", &[], None).unwrap();
    let cache: Arc<dyn ImageCache> = Arc::new(MemoryImageCache::new());

    let report = import_backup(&db, &cache, user_id, &bytes).await.unwrap();

    assert_eq!(report.games_restored, 1);
    assert_eq!(report.user_games_restored, 1);
    assert_eq!(report.entries_skipped, 1);
    assert_eq!(GamesRepository::count_user_games(&db, user_id).await.unwrap(), 1);

    // 留下的那条引用可以解析
    let rows = GamesRepository::find_user_games_with_games(&db, user_id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].1.as_ref().unwrap().title, "传送门 2");
}

// ==================== 原子性与数据丢失边界 ====================

#[tokio::test]
async fn restore_failure_loses_prior_state() {
    let db = setup_db().await;
    let user_id = create_account(&db, "user@example.com").await;
    seed_library(&db, user_id).await;

    // 两份同一提供方的凭据：第二条触发 UNIQUE(user_id, provider) 约束冲突
    let mut document = empty_document("restored@example.com");
    document.games = vec![sample_game_data(10, "传送门 2")];
    document.user_games = vec![sample_user_game(1, 10)];
    document.api_credentials = vec![
        ApiCredentialData {
            id: 1,
            user_id: 42,
            provider: "igdb".to_string(),
            api_key: Some("first".to_string()),
            access_token: None,
            refresh_token: None,
            expires_at: None,
            is_active: true,
        },
        ApiCredentialData {
            id: 2,
            user_id: 42,
            provider: "igdb".to_string(),
            api_key: Some("second".to_string()),
            access_token: None,
            refresh_token: None,
            expires_at: None,
            is_active: true,
        },
    ];

    let bytes = archive::write_archive(&document, "manifest", &[], None).unwrap();
    let cache: Arc<dyn ImageCache> = Arc::new(MemoryImageCache::new());

    let result = import_backup(&db, &cache, user_id, &bytes).await;
    let failure: BackupFailure = result.expect_err("凭据冲突应当使恢复失败");
    assert!(failure.message.contains("数据恢复失败"));
    assert!(failure.detail.is_some());

    // 新状态不存在：重建事务整体回滚
    assert_eq!(GamesRepository::count(&db).await.unwrap(), 0);
    assert_eq!(GamesRepository::count_user_games(&db, user_id).await.unwrap(), 0);
    assert!(CredentialsRepository::find_by_user(&db, user_id)
        .await
        .unwrap()
        .is_empty());

    // 旧状态同样不存在：删除阶段已独立提交，本引擎不负责找回
    assert_eq!(MoviesRepository::count(&db).await.unwrap(), 0);
    assert_eq!(MoviesRepository::count_user_movies(&db, user_id).await.unwrap(), 0);

    // 资料覆盖在回滚的事务内，账号资料保持原样
    let user = UsersRepository::find_by_id(&db, user_id).await.unwrap().unwrap();
    assert_eq!(user.email, "user@example.com");
}

// ==================== 图片失败容忍 ====================

#[tokio::test]
async fn export_tolerates_materialization_failures() {
    let db = setup_db().await;
    let user_id = create_account(&db, "user@example.com").await;

    // 7 个截图 URL，其中 #3 和 #6 不在数据源中，物化必定失败
    let urls: Vec<String> = (1..=7)
        .map(|i| format!("https://img.example.com/shot-{}.png", i))
        .collect();
    GamesRepository::insert(
        &db,
        InsertGameData {
            title: "见证者".to_string(),
            cover_url: None,
            banner_url: None,
            screenshot_urls: Some(UrlList(urls.clone())),
            developer: None,
            release_date: None,
            summary: None,
        },
    )
    .await
    .unwrap();
    let game_id = GamesRepository::find_all(&db).await.unwrap()[0].id;
    GamesRepository::insert_user_game(
        &db,
        InsertUserGameData {
            user_id,
            game_id,
            status: "playing".to_string(),
            rating: None,
            notes: None,
            platform: None,
        },
    )
    .await
    .unwrap();

    let source: HashMap<String, Vec<u8>> = urls
        .iter()
        .enumerate()
        .filter(|(index, _)| index + 1 != 3 && index + 1 != 6)
        .map(|(_, url)| (url.clone(), vec![0u8; 4]))
        .collect();
    let cache: Arc<dyn ImageCache> = Arc::new(MemoryImageCache::with_source(source));

    let payload = build_backup(&db, &cache, user_id, None)
        .await
        .expect("单个图片失败不应中止导出");

    assert_eq!(payload.failed_urls.len(), 2);
    let parsed = read_archive(&payload.bytes).unwrap();
    assert_eq!(parsed.images.len(), 5);
    for failed in &payload.failed_urls {
        let missing = cache_filename(failed);
        assert!(parsed.images.iter().all(|image| image.filename != missing));
    }
}

// ==================== 分批边界 ====================

struct MaterializeEvent {
    url: String,
    started: Instant,
    finished: Instant,
}

/// 记录每次物化起止时间的测试替身
#[derive(Default)]
struct RecordingImageCache {
    events: Mutex<Vec<MaterializeEvent>>,
}

#[async_trait::async_trait]
impl ImageCache for RecordingImageCache {
    async fn materialize(&self, url: &str) -> Result<Vec<u8>, ImageCacheError> {
        let started = Instant::now();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let finished = Instant::now();
        self.events.lock().push(MaterializeEvent {
            url: url.to_string(),
            started,
            finished,
        });
        Ok(vec![0u8; 2])
    }

    async fn list_all(&self) -> Result<Vec<CachedImage>, ImageCacheError> {
        Ok(vec![])
    }

    async fn restore(
        &self,
        _images: Vec<CachedImage>,
    ) -> Result<CacheRestoreSummary, ImageCacheError> {
        Ok(CacheRestoreSummary::default())
    }

    async fn stats(&self) -> Result<CacheStats, ImageCacheError> {
        Ok(CacheStats::default())
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn materialization_batches_never_overlap() {
    let db = setup_db().await;
    let user_id = create_account(&db, "user@example.com").await;

    // 清掉头像，让数据图正好引用 12 个 URL
    let user = UsersRepository::find_by_id(&db, user_id).await.unwrap().unwrap();
    let mut profile = UserProfileData::from(&user).to_profile_update();
    profile.avatar_url = None;
    UsersRepository::overwrite_profile(&db, user_id, profile).await.unwrap();

    // 12 个 URL，批大小 5 → 3 批（5/5/2）；URL 命名保证字典序即批次序
    let urls: Vec<String> = (0..12)
        .map(|i| format!("https://img.example.com/shot-{:02}.png", i))
        .collect();
    GamesRepository::insert(
        &db,
        InsertGameData {
            title: "外环".to_string(),
            cover_url: None,
            banner_url: None,
            screenshot_urls: Some(UrlList(urls.clone())),
            developer: None,
            release_date: None,
            summary: None,
        },
    )
    .await
    .unwrap();
    let game_id = GamesRepository::find_all(&db).await.unwrap()[0].id;
    GamesRepository::insert_user_game(
        &db,
        InsertUserGameData {
            user_id,
            game_id,
            status: "backlog".to_string(),
            rating: None,
            notes: None,
            platform: None,
        },
    )
    .await
    .unwrap();

    let recorder = Arc::new(RecordingImageCache::default());
    let cache: Arc<dyn ImageCache> = recorder.clone();

    build_backup(&db, &cache, user_id, None).await.unwrap();

    let events = recorder.events.lock();
    assert_eq!(events.len(), 12);

    // 重建批次归属：URL 集合按字典序分批
    let mut sorted_urls: Vec<String> = events.iter().map(|e| e.url.clone()).collect();
    sorted_urls.sort();
    let batch_of = |url: &str| -> usize {
        sorted_urls.iter().position(|u| u == url).unwrap() / 5
    };

    let batch_count = sorted_urls.len().div_ceil(5);
    assert_eq!(batch_count, 3);

    for k in 0..batch_count - 1 {
        let latest_finish = events
            .iter()
            .filter(|e| batch_of(&e.url) == k)
            .map(|e| e.finished)
            .max()
            .unwrap();
        let earliest_start = events
            .iter()
            .filter(|e| batch_of(&e.url) == k + 1)
            .map(|e| e.started)
            .min()
            .unwrap();
        assert!(
            earliest_start >= latest_finish,
            "第 {} 批在第 {} 批结束前就开始了",
            k + 2,
            k + 1
        );
    }

    // 批大小分布 5/5/2
    for (k, expected) in [5usize, 5, 2].into_iter().enumerate() {
        let size = events.iter().filter(|e| batch_of(&e.url) == k).count();
        assert_eq!(size, expected, "第 {} 批大小不符", k + 1);
    }
}

// ==================== 上传校验门 ====================

#[tokio::test]
async fn archive_without_document_is_rejected_before_any_write() {
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    let db = setup_db().await;
    let user_id = create_account(&db, "user@example.com").await;
    seed_library(&db, user_id).await;

    // 只有清单和一张图片、没有数据条目的 zip
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    zip.start_file(MANIFEST_ENTRY_NAME, options).unwrap();
    zip.write_all(b"manifest only").unwrap();
    zip.start_file("images/orphan.jpg", options).unwrap();
    zip.write_all(&[9, 9, 9]).unwrap();
    let bytes = zip.finish().unwrap().into_inner();

    let cache: Arc<dyn ImageCache> = Arc::new(MemoryImageCache::new());
    let failure = import_backup(&db, &cache, user_id, &bytes)
        .await
        .expect_err("缺少数据条目的档案必须被拒绝");
    assert!(failure.message.contains("无效"));

    // 零数据库写入：既有数据原封不动
    assert_eq!(GamesRepository::count(&db).await.unwrap(), 2);
    assert_eq!(MoviesRepository::count(&db).await.unwrap(), 1);
    assert_eq!(GamesRepository::count_user_games(&db, user_id).await.unwrap(), 2);
    assert_eq!(MoviesRepository::count_user_movies(&db, user_id).await.unwrap(), 1);
    assert_eq!(
        CredentialsRepository::find_by_user(&db, user_id).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn export_unknown_account_is_not_found() {
    let db = setup_db().await;
    let cache: Arc<dyn ImageCache> = Arc::new(MemoryImageCache::new());

    match build_backup(&db, &cache, 404, None).await {
        Err(BackupError::NotFound(404)) => {}
        other => panic!("意外结果: {:?}", other.map(|p| p.filename)),
    }
}

// 档案布局是跨实现导入/导出的对外契约
#[test]
fn archive_layout_constants_are_stable() {
    assert_eq!(DATA_ENTRY_NAME, "backup-data.json");
    assert_eq!(MANIFEST_ENTRY_NAME, "manifest.txt");
    assert_eq!(archive::IMAGE_ENTRY_PREFIX, "images/");
    assert_eq!(archive::ARCHIVE_CONTENT_TYPE, "application/zip");
}
