mod common;

use std::sync::Arc;

use serde_json::{json, Value};
use snack_attack_sdk::{
    actions,
    memory::MemoryStore,
    routes::{api, AppState},
    schema::{User, UserRole},
    store::RecipeStore,
};
use warp::http::StatusCode;

use common::{keys, recipe, session, token, user};

struct TestApp {
    store: Arc<MemoryStore>,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), keys());
        Self { store, state }
    }

    fn token(&self, user: &User) -> String {
        token(user, &self.state.keys)
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = warp::test::request().method(method).path(path);
        if let Some(token) = bearer {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.reply(&api(self.state.clone())).await;
        let body = serde_json::from_slice(response.body()).unwrap_or(Value::Null);
        (response.status(), body)
    }
}

#[tokio::test]
async fn register_and_login() {
    let app = TestApp::new();

    let (status, body) = app
        .request(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "username": "muncher", "email": "m@example.com", "password": "crunchy" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "user");
    assert!(body.get("password").is_none());

    let (status, body) = app
        .request(
            "POST",
            "/auth/register",
            None,
            Some(json!({ "username": "muncher", "email": "m@example.com", "password": "crunchy" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "User already exists");

    let response = warp::test::request()
        .method("POST")
        .path("/auth/login")
        .json(&json!({ "username": "muncher", "password": "crunchy" }))
        .reply(&api(app.state.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()["set-cookie"].to_str().unwrap();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));

    let (status, body) = app
        .request(
            "POST",
            "/auth/login",
            None,
            Some(json!({ "username": "muncher", "password": "soggy" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Invalid credentials");
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let app = TestApp::new();
    let ann = user(app.store.as_ref(), "ann", UserRole::User).await;

    let response = warp::test::request()
        .method("GET")
        .path("/favorites")
        .header("cookie", format!("session={}", app.token(&ann)))
        .reply(&api(app.state.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn review_flow_updates_rating() {
    let app = TestApp::new();
    let author = user(app.store.as_ref(), "author", UserRole::User).await;
    let ann = user(app.store.as_ref(), "ann", UserRole::User).await;
    let bites = recipe(app.store.as_ref(), &author, "Bites", 120.).await;
    let token = app.token(&ann);

    let (status, body) = app
        .request(
            "POST",
            "/reviews",
            Some(&token),
            Some(json!({ "recipeId": bites.id, "rating": 4, "comment": "good" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["recipe_rating"], 4.0);

    let (status, body) = app
        .request(
            "POST",
            "/reviews",
            Some(&token),
            Some(json!({ "recipeId": bites.id, "rating": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["msg"], "You have already reviewed this recipe");

    let (status, body) = app
        .request("GET", &format!("/recipes/{}", bites.id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"], 4.0);
    assert!(body.get("rating_version").is_none());

    let (_, reviews) = app
        .request("GET", &format!("/reviews/recipe/{}", bites.id), None, None)
        .await;
    assert_eq!(reviews.as_array().map(|r| r.len()), Some(1));
}

#[tokio::test]
async fn out_of_range_rating_is_rejected() {
    let app = TestApp::new();
    let author = user(app.store.as_ref(), "author", UserRole::User).await;
    let ann = user(app.store.as_ref(), "ann", UserRole::User).await;
    let bites = recipe(app.store.as_ref(), &author, "Bites", 120.).await;

    let (status, body) = app
        .request(
            "POST",
            "/reviews",
            Some(&app.token(&ann)),
            Some(json!({ "recipeId": bites.id, "rating": 6 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Rating must be between 1-5");
    assert_eq!(
        app.store.get_recipe(bites.id).await.unwrap().unwrap().rating,
        0.
    );
}

#[tokio::test]
async fn trending_is_ranked_by_popularity() {
    let app = TestApp::new();
    let store = app.store.as_ref();
    let author = user(store, "author", UserRole::User).await;
    let ann = user(store, "ann", UserRole::User).await;
    let bob = user(store, "bob", UserRole::User).await;

    let plain = recipe(store, &author, "Plain", 100.).await;
    let loved = recipe(store, &author, "Loved", 200.).await;

    actions::add_to_favorites(loved.id, &session(&ann), store)
        .await
        .unwrap();
    actions::add_to_favorites(loved.id, &session(&bob), store)
        .await
        .unwrap();
    actions::submit_review(loved.id, 5, None, &session(&ann), store)
        .await
        .unwrap();
    actions::submit_review(loved.id, 4, None, &session(&bob), store)
        .await
        .unwrap();

    let (status, body) = app
        .request("GET", "/recipes/trending?limit=5", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let ranked = body.as_array().unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0]["id"], loved.id);
    assert_eq!(ranked[0]["favoritesCount"], 2);
    assert_eq!(ranked[0]["reviewsCount"], 2);
    assert_eq!(ranked[0]["avgRating"], 4.5);
    assert_eq!(ranked[0]["popularityScore"], 3.25);
    assert_eq!(ranked[1]["id"], plain.id);
    assert_eq!(ranked[1]["popularityScore"], 0.0);
}

#[tokio::test]
async fn missing_session_is_unauthenticated() {
    let app = TestApp::new();

    let (status, body) = app
        .request("POST", "/reviews", None, Some(json!({ "recipeId": 1, "rating": 3 })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["msg"], "Not logged in");

    let (status, _) = app
        .request("GET", "/favorites", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn foreign_recipe_cannot_be_changed() {
    let app = TestApp::new();
    let author = user(app.store.as_ref(), "author", UserRole::User).await;
    let ann = user(app.store.as_ref(), "ann", UserRole::User).await;
    let admin = user(app.store.as_ref(), "admin", UserRole::Admin).await;
    let bites = recipe(app.store.as_ref(), &author, "Bites", 120.).await;
    let path = format!("/recipes/{}", bites.id);

    let (status, _) = app
        .request("PUT", &path, Some(&app.token(&ann)), Some(json!({ "title": "Mine" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request("PUT", &path, Some(&app.token(&author)), Some(json!({ "title": "Better bites" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Better bites");
    assert_eq!(body["ingredients"], json!(["oats", "honey"]));

    let (status, _) = app
        .request("DELETE", &path, Some(&app.token(&admin)), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.request("GET", &path, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["msg"], "Recipe not found");
}

#[tokio::test]
async fn admin_routes_require_admin() {
    let app = TestApp::new();
    let ann = user(app.store.as_ref(), "ann", UserRole::User).await;
    let admin = user(app.store.as_ref(), "admin", UserRole::Admin).await;

    let (status, body) = app
        .request("GET", "/users", Some(&app.token(&ann)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["msg"], "Admin access required");

    let (status, body) = app
        .request(
            "PATCH",
            &format!("/users/{}/role", ann.id),
            Some(&app.token(&admin)),
            Some(json!({ "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");

    let (status, body) = app
        .request("GET", "/users", Some(&app.token(&admin)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(|u| u.len()), Some(2));
}

#[tokio::test]
async fn favorites_are_unique_and_owned() {
    let app = TestApp::new();
    let author = user(app.store.as_ref(), "author", UserRole::User).await;
    let ann = user(app.store.as_ref(), "ann", UserRole::User).await;
    let bites = recipe(app.store.as_ref(), &author, "Bites", 120.).await;
    let token = app.token(&ann);

    let (status, favorite) = app
        .request("POST", "/favorites", Some(&token), Some(json!({ "recipeId": bites.id })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .request("POST", "/favorites", Some(&token), Some(json!({ "recipeId": bites.id })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Recipe is already in favorites");

    let path = format!("/favorites/{}", favorite["id"]);
    let (status, _) = app
        .request("DELETE", &path, Some(&app.token(&author)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.request("DELETE", &path, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn calorie_calculator() {
    let app = TestApp::new();
    let author = user(app.store.as_ref(), "author", UserRole::User).await;
    let bites = recipe(app.store.as_ref(), &author, "Bites", 120.).await;
    let bars = recipe(app.store.as_ref(), &author, "Bars", 250.5).await;

    let (status, body) = app
        .request(
            "POST",
            "/recipes/calculate-calories",
            None,
            Some(json!({ "recipeIds": [bites.id, bars.id, 999] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCalories"], 370.5);
    assert_eq!(body["mealCount"], 2);
    assert_eq!(body["breakdown"][0]["title"], "Bites");

    let (status, body) = app
        .request(
            "POST",
            "/recipes/calculate-calories",
            None,
            Some(json!({ "recipeIds": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Invalid recipe IDs");
}

#[tokio::test]
async fn text_download() {
    let app = TestApp::new();
    let author = user(app.store.as_ref(), "author", UserRole::User).await;
    let bites = recipe(app.store.as_ref(), &author, "Bites", 120.).await;

    let response = warp::test::request()
        .method("GET")
        .path(&format!("/recipes/{}/download/text", bites.id))
        .reply(&api(app.state.clone()))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"Bites.txt\""
    );
    let text = String::from_utf8(response.body().to_vec()).unwrap();
    assert!(text.starts_with("Bites\n\n\nINGREDIENTS:\n• oats"));
    assert!(text.ends_with("CALORIES: 120"));
}

#[tokio::test]
async fn recipe_listing_filters_and_pages() {
    let app = TestApp::new();
    let author = user(app.store.as_ref(), "author", UserRole::User).await;
    for n in 0..12 {
        recipe(app.store.as_ref(), &author, &format!("Bar {n:02}"), 100. + n as f64).await;
    }
    recipe(app.store.as_ref(), &author, "Granola", 400.).await;

    let (status, body) = app.request("GET", "/recipes?search=bar", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_rows"], 12);
    assert_eq!(body["rows"].as_array().map(|r| r.len()), Some(10));

    let (_, body) = app
        .request("GET", "/recipes?search=bar&sort=alphabetical&page=2", None, None)
        .await;
    assert_eq!(body["page"], 2);
    assert_eq!(body["rows"].as_array().map(|r| r.len()), Some(2));
    assert_eq!(body["rows"][0]["title"], "Bar 10");

    let (_, body) = app.request("GET", "/recipes?limit=5000", None, None).await;
    assert_eq!(body["page_size"], 100);

    let (_, body) = app
        .request("GET", "/recipes?minCalories=300&sort=alphabetical", None, None)
        .await;
    assert_eq!(body["total_rows"], 1);
    assert_eq!(body["rows"][0]["title"], "Granola");

    let (status, _) = app.request("GET", "/recipes?sort=sideways", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn issued_tokens_follow_stored_user() {
    let app = TestApp::new();
    let admin = user(app.store.as_ref(), "admin", UserRole::Admin).await;
    let root = user(app.store.as_ref(), "root", UserRole::Admin).await;
    let bob = user(app.store.as_ref(), "bob", UserRole::User).await;
    let admin_token = app.token(&admin);
    let bob_token = app.token(&bob);

    let (status, _) = app
        .request(
            "PATCH",
            &format!("/users/{}/role", admin.id),
            Some(&app.token(&root)),
            Some(json!({ "role": "user" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.request("GET", "/users", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["msg"], "Admin access required");

    let (status, _) = app
        .request("DELETE", &format!("/users/{}", bob.id), Some(&app.token(&root)), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .request("POST", "/recipes", Some(&bob_token), Some(json!({ "title": "Ghost bites" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["msg"], "Invalid session; User not found");
    assert_eq!(app.store.list_users().await.unwrap().len(), 2);
}
