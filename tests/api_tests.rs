//! API integration tests against a running server over a fresh database.
//!
//! The admin account below is registered first so that it receives the
//! ADMIN role; point the server at an empty database before running.

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::sync::OnceCell;

const BASE_URL: &str = "http://localhost:8080/api/v1";
const ADMIN_EMAIL: &str = "admin@library.test";
const ADMIN_PASSWORD: &str = "Adm1n#library";

/// Suffix keeping emails and ISBNs unique across runs
fn unique() -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{}", nanos % 1_000_000_000)
}

async fn login(client: &Client, login: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "login": login, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Admin token shared by every test. The admin registers before any other
/// account so it is the one given the ADMIN role.
async fn admin_token(client: &Client) -> String {
    static ADMIN: OnceCell<String> = OnceCell::const_new();

    ADMIN
        .get_or_init(|| async {
            client
                .post(format!("{}/auth/register", BASE_URL))
                .json(&json!({
                    "name": "Library Admin",
                    "email": ADMIN_EMAIL,
                    "password": ADMIN_PASSWORD
                }))
                .send()
                .await
                .expect("Failed to send register request");

            login(client, ADMIN_EMAIL, ADMIN_PASSWORD).await
        })
        .await
        .clone()
}

/// Register a regular user, returning its id and a session token
async fn member(client: &Client) -> (i64, String) {
    // Keep the admin bootstrap ahead of any member registration
    admin_token(client).await;

    let email = format!("member{}@library.test", unique());
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "name": "Library Member",
            "email": email,
            "password": "Memb3r!pass"
        }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["role"], "USER");
    assert!(body.get("password").is_none());

    let token = login(client, &email, "Memb3r!pass").await;
    (body["id"].as_i64().expect("No id"), token)
}

async fn add_titled_book(client: &Client, admin: &str, title: &str) -> i64 {
    let response = client
        .post(format!("{}/book/add", BASE_URL))
        .bearer_auth(admin)
        .json(&json!({
            "title": title,
            "author": "Ursula K. Le Guin",
            "genre": "Science fiction",
            "publicationYear": 1969
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["isAvailable"], true);
    body["id"].as_i64().expect("No id")
}

async fn add_book(client: &Client, admin: &str) -> i64 {
    add_titled_book(client, admin, &format!("The Left Hand of Darkness {}", unique())).await
}

/// Borrow a book and return it straight away
async fn borrow_and_return(client: &Client, token: &str, book_id: i64) {
    let response = client
        .post(format!("{}/transaction/borrow", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "bookId": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let transaction: Value = response.json().await.expect("Failed to parse response");

    let response = client
        .put(format!("{}/transaction/return/{}", BASE_URL, transaction["id"]))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "login": ADMIN_EMAIL, "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_logout_revokes_token() {
    let client = Client::new();
    let (_, token) = member(&client).await;

    let response = client
        .post(format!("{}/auth/logout", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_member_cannot_add_book() {
    let client = Client::new();
    let (_, token) = member(&client).await;

    let response = client
        .post(format!("{}/book/add", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Kindred",
            "author": "Octavia E. Butler",
            "genre": "Fiction",
            "publicationYear": 1979
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_cycle() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book_id = add_book(&client, &admin).await;
    let (user_id, token) = member(&client).await;

    // Borrow
    let response = client
        .post(format!("{}/transaction/borrow", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "bookId": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let transaction: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(transaction["userId"], user_id);
    assert!(transaction["returnedAt"].is_null());

    // Second borrow of the same book is refused
    let response = client
        .post(format!("{}/transaction/borrow", BASE_URL))
        .bearer_auth(&admin)
        .json(&json!({ "bookId": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A borrowed book cannot be deleted
    let response = client
        .delete(format!("{}/book/delete/{}", BASE_URL, book_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let book: Value = client
        .get(format!("{}/book/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(book["isAvailable"], false);
    assert_eq!(book["borrowCount"], 1);

    // Return
    let response = client
        .put(format!("{}/transaction/return/{}", BASE_URL, transaction["id"]))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .put(format!("{}/transaction/return/{}", BASE_URL, transaction["id"]))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let borrowed: Value = client
        .get(format!("{}/book/borrowed/{}", BASE_URL, user_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(borrowed[0]["id"], book_id);
    assert_eq!(borrowed[0]["currentlyBorrowed"], false);
}

#[tokio::test]
#[ignore]
async fn test_list_books_paginates() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books?page=1&limit=500", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 100);
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_frequently_borrowed_ranks_by_count_then_id() {
    let client = Client::new();
    let admin = admin_token(&client).await;

    let tag = unique();
    let first = add_titled_book(&client, &admin, &format!("Rank A {}", tag)).await;
    let second = add_titled_book(&client, &admin, &format!("Rank B {}", tag)).await;
    let third = add_titled_book(&client, &admin, &format!("Rank C {}", tag)).await;

    // first: 2, second: 3, third: 2 (ties with first, higher id)
    for (book_id, times) in [(first, 2), (second, 3), (third, 2)] {
        for _ in 0..times {
            borrow_and_return(&client, &admin, book_id).await;
        }
    }

    let ranking: Value = client
        .get(format!("{}/books/frequently-borrowed?limit=100", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let ranking = ranking.as_array().expect("Expected an array");

    // Whole list: count descending, ties by ascending id
    for pair in ranking.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let (count_a, count_b) = (a["timesBorrowed"].as_i64().unwrap(), b["timesBorrowed"].as_i64().unwrap());
        assert!(
            count_a > count_b || (count_a == count_b && a["id"].as_i64() < b["id"].as_i64()),
            "out of order: {} then {}",
            a,
            b
        );
    }

    let ours: Vec<(i64, i64)> = ranking
        .iter()
        .filter_map(|book| {
            let id = book["id"].as_i64()?;
            [first, second, third]
                .contains(&id)
                .then(|| (id, book["timesBorrowed"].as_i64().unwrap_or_default()))
        })
        .collect();
    assert_eq!(ours, vec![(second, 3), (first, 2), (third, 2)]);
}

#[tokio::test]
#[ignore]
async fn test_second_page_holds_rows_eleven_to_twenty() {
    let client = Client::new();
    let admin = admin_token(&client).await;

    let tag = format!("Paged{}", unique());
    let mut ids = Vec::new();
    for i in 0..25 {
        ids.push(add_titled_book(&client, &admin, &format!("{} volume {}", tag, i)).await);
    }

    let body: Value = client
        .get(format!("{}/books?search={}&page=2&limit=10", BASE_URL, tag))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(body["total"], 25);
    assert_eq!(body["page"], 2);
    let page: Vec<i64> = body["items"]
        .as_array()
        .expect("Expected items")
        .iter()
        .filter_map(|book| book["id"].as_i64())
        .collect();
    assert_eq!(page, ids[10..20].to_vec());
}
