use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Form, Multipart, Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};
use tracing::{debug, info, warn};

use crate::{
    AppState,
    error::{AppResult, StoreError, UploadError},
    forms::{self, Form as _, FormErrors, MovieForm, ReviewForm},
    models::MovieDetail,
    templates, upload,
};

pub fn router(state: Arc<AppState>) -> Router {
    let max_body = state.config.max_upload_bytes;
    let covers = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/", get(home))
        .route("/movie/{id}", get(get_movie).post(post_review))
        .route("/add-movie", get(add_movie_form).post(add_movie))
        .nest_service("/covers", covers)
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body))
}

/// 302 to `location`, the redirect browsers follow with a GET after a POST.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

fn movie_url(id: i32) -> String {
    format!("/movie/{id}")
}

pub async fn home(State(state): State<Arc<AppState>>) -> AppResult<Html<String>> {
    let movies = state.store.list_movies().await?;
    Ok(Html(templates::home_page(&movies)))
}

async fn load_detail(state: &AppState, id: i64) -> AppResult<Option<MovieDetail>> {
    // ids past the key column's range cannot name a stored movie
    let Ok(id) = i32::try_from(id) else {
        return Ok(None);
    };
    let Some(movie) = state.store.get_movie(id).await? else {
        return Ok(None);
    };
    let reviews = state.store.reviews_for(movie.id).await?;
    Ok(Some(MovieDetail::new(movie, reviews)))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let Some(detail) = load_detail(&state, id).await? else {
        debug!(movie_id = id, "unknown movie, back to home");
        return Ok(found("/"));
    };

    let body = templates::movie_page(&detail, &ReviewForm::default(), &FormErrors::default());
    Ok(Html(body).into_response())
}

pub async fn post_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Form(form): Form<ReviewForm>,
) -> AppResult<Response> {
    let Some(detail) = load_detail(&state, id).await? else {
        debug!(movie_id = id, "review for unknown movie, back to home");
        return Ok(found("/"));
    };

    let review = match form.validate(&state.config) {
        Ok(review) => review,
        Err(errors) => {
            debug!(movie_id = id, ?errors, "review rejected");
            return Ok(Html(templates::movie_page(&detail, &form, &errors)).into_response());
        },
    };

    let movie_id = detail.movie.id;
    match state.store.insert_review(movie_id, &review.name, &review.text, review.score).await {
        Ok(_) => Ok(found(&movie_url(movie_id))),
        // deleted between the lookup and the insert
        Err(StoreError::NotFound(_)) => Ok(found("/")),
        Err(err) => Err(err.into()),
    }
}

pub async fn add_movie_form() -> Html<String> {
    Html(templates::add_movie_page(&MovieForm::default(), &FormErrors::default()))
}

pub async fn add_movie(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = MovieForm::from_multipart(multipart).await?;
    let rerender =
        |errors: FormErrors| Html(templates::add_movie_page(&form, &errors)).into_response();

    let movie = match form.validate(&state.config) {
        Ok(movie) => movie,
        Err(errors) => {
            debug!(?errors, "movie rejected");
            return Ok(rerender(errors));
        },
    };

    if state.store.title_taken(&movie.title).await? {
        return Ok(rerender(FormErrors::single("title", forms::DUPLICATE_TITLE)));
    }

    let config = &state.config;
    let cover =
        match upload::save_cover(&config.upload_dir, &movie.cover, &config.cover_extensions).await {
            Ok(cover) => cover,
            Err(UploadError::Io(err)) => return Err(UploadError::Io(err).into()),
            Err(err) => {
                debug!(error = %err, "cover rejected");
                return Ok(rerender(FormErrors::single("cover", forms::COVER_NOT_ALLOWED)));
            },
        };

    match state.store.insert_movie(&movie.title, &movie.description, &cover).await {
        Ok(created) => {
            info!(movie_id = created.id, title = %created.title, "movie added");
            Ok(found(&movie_url(created.id)))
        },
        Err(StoreError::ConstraintViolation(title)) => {
            warn!(%title, %cover, "title taken while uploading, cover left on disk");
            Ok(rerender(FormErrors::single("title", forms::DUPLICATE_TITLE)))
        },
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, Bytes, to_bytes},
        http::Request,
    };
    use tempfile::TempDir;
    use tower::ServiceExt as _;

    use super::*;
    use crate::{
        config::{Config, DEFAULT_MAX_UPLOAD_BYTES, default_cover_extensions},
        db,
        store::MovieStore,
    };

    const BOUNDARY: &str = "reviewbox-test-boundary";

    struct TestApp {
        dir: TempDir,
        state: Arc<AppState>,
    }

    impl TestApp {
        async fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let database_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
            let config = Config {
                addr: "127.0.0.1:0".parse().unwrap(),
                database_url,
                upload_dir: dir.path().join("img"),
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
                cover_extensions: default_cover_extensions(),
            };
            let db = db::connect_and_migrate(&config.database_url).await.unwrap();
            let state = Arc::new(AppState { config: Arc::new(config), store: MovieStore::new(db) });
            Self { dir, state }
        }

        fn store(&self) -> &MovieStore {
            &self.state.store
        }

        async fn send(&self, req: Request<Body>) -> (StatusCode, Option<String>, String) {
            let resp = router(self.state.clone()).oneshot(req).await.unwrap();
            let status = resp.status();
            let location = resp
                .headers()
                .get(header::LOCATION)
                .map(|v| v.to_str().unwrap().to_string());
            let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            (status, location, String::from_utf8_lossy(&body).into_owned())
        }

        async fn get(&self, uri: &str) -> (StatusCode, Option<String>, String) {
            self.send(Request::get(uri).body(Body::empty()).unwrap()).await
        }

        async fn post_review(&self, id: i32, body: &str) -> (StatusCode, Option<String>, String) {
            let req = Request::post(movie_url(id))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap();
            self.send(req).await
        }

        async fn post_movie(&self, body: Vec<u8>) -> (StatusCode, Option<String>, String) {
            let req = Request::post("/add-movie")
                .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
                .header(header::CONTENT_LENGTH, body.len())
                .body(Body::from(body))
                .unwrap();
            self.send(req).await
        }
    }

    fn multipart(title: &str, description: &str, cover: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in [("title", title), ("description", description)] {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        let (file_name, data) = cover.unwrap_or(("", &[][..]));
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"cover\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    #[tokio::test]
    async fn home_lists_movies() {
        let app = TestApp::new().await;
        app.store().insert_movie("Alien", "In space", "alien.png").await.unwrap();

        let (status, _, body) = app.get("/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Alien"));
        assert!(body.contains(r#"href="/movie/1""#));
    }

    #[tokio::test]
    async fn add_movie_round_trip() {
        let app = TestApp::new().await;

        let body = multipart("Inception", "...", Some(("poster.png", b"\x89PNG data".as_slice())));
        let (status, location, _) = app.post_movie(body).await;

        assert_eq!(status, StatusCode::FOUND);
        let movies = app.store().list_movies().await.unwrap();
        assert_eq!(movies.len(), 1);
        let movie = &movies[0];
        assert_eq!(location.as_deref(), Some(movie_url(movie.id).as_str()));
        assert_eq!(movie.title, "Inception");
        assert_eq!(movie.description, "...");
        assert_eq!(movie.cover, "poster.png");
        let saved = tokio::fs::read(app.dir.path().join("img").join("poster.png")).await.unwrap();
        assert_eq!(saved, b"\x89PNG data");

        let (status, _, page) = app.get(&movie_url(movie.id)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(page.contains("Inception"));
        assert!(page.contains(r#"src="/covers/poster.png""#));
        assert!(page.contains(r#"<option value="10" selected>"#));

        let (status, _, _) = app.get("/covers/poster.png").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn gif_cover_is_rejected() {
        let app = TestApp::new().await;

        let body = multipart("Inception", "Dreams", Some(("poster.gif", b"GIF89a".as_slice())));
        let (status, _, page) = app.post_movie(body).await;

        assert_eq!(status, StatusCode::OK);
        assert!(page.contains("Only PNG/JPG are allowed!"));
        assert!(page.contains(r#"value="Inception""#));
        assert!(app.store().list_movies().await.unwrap().is_empty());
        assert!(!app.dir.path().join("img").exists());
    }

    #[tokio::test]
    async fn missing_fields_are_reported() {
        let app = TestApp::new().await;

        let (status, _, page) = app.post_movie(multipart("", "", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(page.contains("Title cant be empty!"));
        assert!(page.contains("Description cant be empty!"));
        assert!(page.contains("Cover cant be empty!"));
        assert!(app.store().list_movies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_title_becomes_a_form_error() {
        let app = TestApp::new().await;
        app.store().insert_movie("Inception", "First", "first.png").await.unwrap();

        let body = multipart("Inception", "Second", Some(("second.png", b"png".as_slice())));
        let (status, _, page) = app.post_movie(body).await;

        assert_eq!(status, StatusCode::OK);
        assert!(page.contains(forms::DUPLICATE_TITLE));
        assert_eq!(app.store().list_movies().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let app = TestApp::new().await;
        let big = vec![0u8; DEFAULT_MAX_UPLOAD_BYTES + 1];

        let body = multipart("Huge", "Too big", Some(("huge.png", big.as_slice())));
        let (status, _, _) = app.post_movie(body).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(app.store().list_movies().await.unwrap().is_empty());
        assert!(!app.dir.path().join("img").exists());
    }

    #[tokio::test]
    async fn oversized_stream_without_length_is_rejected() {
        let app = TestApp::new().await;
        let big = vec![0u8; DEFAULT_MAX_UPLOAD_BYTES + 10];
        let body = multipart("Huge", "Too big", Some(("huge.png", big.as_slice())));
        let chunks: Vec<Result<Bytes, std::io::Error>> =
            body.chunks(64 * 1024).map(|c| Ok(Bytes::copy_from_slice(c))).collect();

        let req = Request::post("/add-movie")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from_stream(futures::stream::iter(chunks)))
            .unwrap();
        let (status, _, page) = app.send(req).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(page.contains("The upload exceeds the size limit."));
        assert!(app.store().list_movies().await.unwrap().is_empty());
        assert!(!app.dir.path().join("img").exists());
    }

    #[tokio::test]
    async fn unknown_movie_redirects_home() {
        let app = TestApp::new().await;

        let (status, location, _) = app.get("/movie/99").await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(location.as_deref(), Some("/"));

        let (status, location, _) = app.post_review(99, "name=Ann&text=Hi&score=5").await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(location.as_deref(), Some("/"));
        assert!(app.store().list_movies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn id_past_key_range_redirects_home() {
        let app = TestApp::new().await;
        app.store().insert_movie("Heat", "LA", "heat.jpg").await.unwrap();

        let (status, location, _) = app.get("/movie/99999999999").await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(location.as_deref(), Some("/"));

        let req = Request::post("/movie/99999999999")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("name=Ann&text=Hi&score=5"))
            .unwrap();
        let (status, location, _) = app.send(req).await;
        assert_eq!(status, StatusCode::FOUND);
        assert_eq!(location.as_deref(), Some("/"));
    }

    #[tokio::test]
    async fn review_is_visible_after_redirect() {
        let app = TestApp::new().await;
        let movie = app.store().insert_movie("Heat", "LA", "heat.jpg").await.unwrap();

        for (name, score) in [("Ann", 8), ("Bob", 9), ("Cid", 10)] {
            let (status, location, _) =
                app.post_review(movie.id, &format!("name={name}&text=Good&score={score}")).await;
            assert_eq!(status, StatusCode::FOUND);
            assert_eq!(location, Some(movie_url(movie.id)));
        }

        let (_, _, first) = app.get(&movie_url(movie.id)).await;
        let (_, _, second) = app.get(&movie_url(movie.id)).await;
        assert!(first.contains(r#"<span id="average-score" class="font-semibold text-gray-900">9</span>"#));
        assert!(first.contains("Bob"));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn movie_without_reviews_scores_zero() {
        let app = TestApp::new().await;
        let movie = app.store().insert_movie("Heat", "LA", "heat.jpg").await.unwrap();

        let (_, _, page) = app.get(&movie_url(movie.id)).await;

        assert!(page.contains(r#"<span id="average-score" class="font-semibold text-gray-900">0</span>"#));
    }

    #[tokio::test]
    async fn out_of_range_score_creates_nothing() {
        let app = TestApp::new().await;
        let movie = app.store().insert_movie("Heat", "LA", "heat.jpg").await.unwrap();

        for score in ["11", "-1", "abc"] {
            let (status, _, page) =
                app.post_review(movie.id, &format!("name=Ann&text=Kept+text&score={score}")).await;
            assert_eq!(status, StatusCode::OK);
            assert!(page.contains("Kept text"));
            assert!(page.contains(r#"value="Ann""#));
        }

        assert!(app.store().reviews_for(movie.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_review_reports_each_field() {
        let app = TestApp::new().await;
        let movie = app.store().insert_movie("Heat", "LA", "heat.jpg").await.unwrap();

        let (status, _, page) = app.post_review(movie.id, "name=&text=&score=").await;

        assert_eq!(status, StatusCode::OK);
        assert!(page.contains("Name cant be empty!"));
        assert!(page.contains("Text cant be empty!"));
        assert!(page.contains("Score cant be empty!"));
    }
}
