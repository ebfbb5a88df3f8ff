//! API integration tests
//!
//! These run against a live server seeded with a staff account
//! (login `admin`, password `admin`). Run with: cargo test -- --ignored

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Log in and return a bearer token
async fn get_auth_token(client: &Client, login: &str, password: &str) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "login": login,
            "password": password
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Create a patron account via the staff token and return its token
async fn create_patron(client: &Client, staff_token: &str, login: &str) -> String {
    let response = client
        .post(format!("{}/users", BASE_URL))
        .header("Authorization", format!("Bearer {}", staff_token))
        .json(&json!({
            "login": login,
            "password": "secret",
            "account_type": "patron"
        }))
        .send()
        .await
        .expect("Failed to create patron");
    assert!(
        response.status() == 201 || response.status() == 409,
        "unexpected status: {}",
        response.status()
    );

    get_auth_token(client, login, "secret").await
}

/// Create an author and a fresh book, returning (author_id, book_id)
async fn create_author_and_book(
    client: &Client,
    staff_token: &str,
    author_name: (&str, &str),
    title: &str,
    isbn: &str,
) -> (i64, i64) {
    let response = client
        .post(format!("{}/authors", BASE_URL))
        .header("Authorization", format!("Bearer {}", staff_token))
        .json(&json!({
            "first_name": author_name.0,
            "last_name": author_name.1,
            "birth_date": "1920-10-08",
            "nationality": "American"
        }))
        .send()
        .await
        .expect("Failed to create author");
    assert_eq!(response.status(), 201);
    let author: Value = response.json().await.expect("Failed to parse author");
    let author_id = author["id"].as_i64().expect("No author ID");

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", staff_token))
        .json(&json!({
            "title": title,
            "author_id": author_id,
            "isbn": isbn,
            "publication_date": "1965-08-01",
            "genre": "fantasy",
            "page_count": 412
        }))
        .send()
        .await
        .expect("Failed to create book");
    assert_eq!(response.status(), 201);
    let book: Value = response.json().await.expect("Failed to parse book");
    let book_id = book["id"].as_i64().expect("No book ID");

    (author_id, book_id)
}

/// Unique ISBN per test run (13 digits)
fn fresh_isbn(prefix: u32) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    format!("978{:02}{:08}", prefix % 100, nanos % 100_000_000)
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
async fn test_readiness_reports_database() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "login": "admin",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_list_books_public() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_list_pagination_echoes_effective_values() {
    let client = Client::new();

    let body: Value = client
        .get(format!("{}/books?page=0&per_page=500", BASE_URL))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(body["page"], 1);
    assert_eq!(body["per_page"], 100);
    assert!(body["items"].as_array().unwrap().len() <= 100);
}

#[tokio::test]
#[ignore]
async fn test_catalog_writes_require_staff() {
    let client = Client::new();
    let staff_token = get_auth_token(&client, "admin", "admin").await;
    let patron_token = create_patron(&client, &staff_token, "patron_writes").await;

    let response = client
        .post(format!("{}/authors", BASE_URL))
        .header("Authorization", format!("Bearer {}", patron_token))
        .json(&json!({
            "first_name": "Jane",
            "last_name": "Doe",
            "birth_date": "1970-01-01",
            "nationality": "British"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_isbn_rejected() {
    let client = Client::new();
    let staff_token = get_auth_token(&client, "admin", "admin").await;
    let isbn = fresh_isbn(1);
    let (author_id, _) =
        create_author_and_book(&client, &staff_token, ("Frank", "Herbert"), "Dune", &isbn).await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .header("Authorization", format!("Bearer {}", staff_token))
        .json(&json!({
            "title": "Dune (reprint)",
            "author_id": author_id,
            "isbn": isbn,
            "publication_date": "1990-01-01",
            "genre": "fantasy",
            "page_count": 412
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "Validation error");
}

/// The full scenario: create author and book, lend as alice, second lend
/// fails, return succeeds, second return fails.
#[tokio::test]
#[ignore]
async fn test_lend_return_scenario() {
    let client = Client::new();
    let staff_token = get_auth_token(&client, "admin", "admin").await;
    let alice_token = create_patron(&client, &staff_token, "alice_scenario").await;
    let bob_token = create_patron(&client, &staff_token, "bob_scenario").await;

    let isbn = fresh_isbn(2);
    let (_, book_id) =
        create_author_and_book(&client, &staff_token, ("Jane", "Doe"), "Dune", &isbn).await;

    // Lend as alice → success, book becomes unavailable
    let response = client
        .post(format!("{}/books/{}/lend", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", alice_token))
        .send()
        .await
        .expect("Failed to lend");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse lend response");
    let loan_id = body["loan_id"].as_i64().expect("No loan ID");
    assert_eq!(body["book_title"], "Dune");

    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to fetch book")
        .json()
        .await
        .expect("Failed to parse book");
    assert_eq!(book["available"], false);

    // Lend as bob → Book unavailable, no mutation
    let response = client
        .post(format!("{}/books/{}/lend", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", bob_token))
        .send()
        .await
        .expect("Failed to lend");
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "Book unavailable");

    // Return as alice → success, book available again
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", alice_token))
        .send()
        .await
        .expect("Failed to return");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("Failed to parse return response");
    assert_eq!(body["loan"]["returned"], true);
    assert!(body["loan"]["return_date"].is_string());

    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to fetch book")
        .json()
        .await
        .expect("Failed to parse book");
    assert_eq!(book["available"], true);

    // Second return → Already returned
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", alice_token))
        .send()
        .await
        .expect("Failed to return");
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "Already returned");
}

/// N concurrent lends of one available book: exactly one succeeds.
#[tokio::test]
#[ignore]
async fn test_concurrent_lends_single_winner() {
    let client = Client::new();
    let staff_token = get_auth_token(&client, "admin", "admin").await;
    let patron_token = create_patron(&client, &staff_token, "patron_concurrent").await;

    let isbn = fresh_isbn(3);
    let (_, book_id) = create_author_and_book(
        &client,
        &staff_token,
        ("Isaac", "Asimov"),
        "Foundation",
        &isbn,
    )
    .await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        let token = patron_token.clone();
        handles.push(tokio::spawn(async move {
            client
                .post(format!("{}/books/{}/lend", BASE_URL, book_id))
                .header("Authorization", format!("Bearer {}", token))
                .send()
                .await
                .expect("Failed to lend")
                .status()
                .as_u16()
        }));
    }

    let mut successes = 0;
    let mut rejections = 0;
    for handle in handles {
        match handle.await.expect("Task panicked") {
            201 => successes += 1,
            400 => rejections += 1,
            other => panic!("Unexpected status: {}", other),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(rejections, 7);
}

/// Patrons see only their own loans; staff see all.
#[tokio::test]
#[ignore]
async fn test_loan_visibility_scoping() {
    let client = Client::new();
    let staff_token = get_auth_token(&client, "admin", "admin").await;
    let carol_token = create_patron(&client, &staff_token, "carol_scope").await;
    let dave_token = create_patron(&client, &staff_token, "dave_scope").await;

    let isbn = fresh_isbn(4);
    let (_, book_id) = create_author_and_book(
        &client,
        &staff_token,
        ("Ursula", "Le Guin"),
        "The Dispossessed",
        &isbn,
    )
    .await;

    let response = client
        .post(format!("{}/books/{}/lend", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", carol_token))
        .send()
        .await
        .expect("Failed to lend");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse lend response");
    let loan_id = body["loan_id"].as_i64().expect("No loan ID");

    // Carol sees her loan in the listing
    let loans: Value = client
        .get(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", carol_token))
        .send()
        .await
        .expect("Failed to list loans")
        .json()
        .await
        .expect("Failed to parse loans");
    assert!(loans["items"]
        .as_array()
        .unwrap()
        .iter()
        .any(|l| l["id"].as_i64() == Some(loan_id)));

    // Dave cannot see it, neither in the listing nor directly
    let loans: Value = client
        .get(format!("{}/loans", BASE_URL))
        .header("Authorization", format!("Bearer {}", dave_token))
        .send()
        .await
        .expect("Failed to list loans")
        .json()
        .await
        .expect("Failed to parse loans");
    assert!(!loans["items"]
        .as_array()
        .unwrap()
        .iter()
        .any(|l| l["id"].as_i64() == Some(loan_id)));

    let response = client
        .get(format!("{}/loans/{}", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", dave_token))
        .send()
        .await
        .expect("Failed to fetch loan");
    assert_eq!(response.status(), 404);

    // Staff sees it
    let response = client
        .get(format!("{}/loans/{}", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", staff_token))
        .send()
        .await
        .expect("Failed to fetch loan");
    assert_eq!(response.status(), 200);

    // Listing loans requires authentication
    let response = client
        .get(format!("{}/loans", BASE_URL))
        .send()
        .await
        .expect("Failed to list loans");
    assert_eq!(response.status(), 401);
}

/// Deleting an outstanding loan puts the book back in circulation.
#[tokio::test]
#[ignore]
async fn test_loan_deletion_restores_availability() {
    let client = Client::new();
    let staff_token = get_auth_token(&client, "admin", "admin").await;
    let patron_token = create_patron(&client, &staff_token, "frank_cleanup").await;

    let isbn = fresh_isbn(6);
    let (_, book_id) = create_author_and_book(
        &client,
        &staff_token,
        ("Octavia", "Butler"),
        "Kindred",
        &isbn,
    )
    .await;

    let response = client
        .post(format!("{}/books/{}/lend", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", patron_token))
        .send()
        .await
        .expect("Failed to lend");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse lend response");
    let loan_id = body["loan_id"].as_i64().expect("No loan ID");

    let response = client
        .delete(format!("{}/loans/{}", BASE_URL, loan_id))
        .header("Authorization", format!("Bearer {}", staff_token))
        .send()
        .await
        .expect("Failed to delete loan");
    assert_eq!(response.status(), 204);

    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to fetch book")
        .json()
        .await
        .expect("Failed to parse book");
    assert_eq!(book["available"], true);

    // The book can be lent again
    let response = client
        .post(format!("{}/books/{}/lend", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", patron_token))
        .send()
        .await
        .expect("Failed to lend");
    assert_eq!(response.status(), 201);
}

/// Deleting a user cascades away their loans; books they held come back
/// into circulation.
#[tokio::test]
#[ignore]
async fn test_user_deletion_restores_availability() {
    let client = Client::new();
    let staff_token = get_auth_token(&client, "admin", "admin").await;
    let erin_token = create_patron(&client, &staff_token, "erin_remove").await;

    let erin: Value = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", erin_token))
        .send()
        .await
        .expect("Failed to fetch profile")
        .json()
        .await
        .expect("Failed to parse profile");
    let erin_id = erin["id"].as_i64().expect("No user ID");

    let isbn = fresh_isbn(7);
    let (_, book_id) = create_author_and_book(
        &client,
        &staff_token,
        ("Stanislaw", "Lem"),
        "Solaris",
        &isbn,
    )
    .await;

    let response = client
        .post(format!("{}/books/{}/lend", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", erin_token))
        .send()
        .await
        .expect("Failed to lend");
    assert_eq!(response.status(), 201);

    let response = client
        .delete(format!("{}/users/{}", BASE_URL, erin_id))
        .header("Authorization", format!("Bearer {}", staff_token))
        .send()
        .await
        .expect("Failed to delete user");
    assert_eq!(response.status(), 204);

    let book: Value = client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .send()
        .await
        .expect("Failed to fetch book")
        .json()
        .await
        .expect("Failed to parse book");
    assert_eq!(book["available"], true);

    // Another patron can now borrow it
    let other_token = create_patron(&client, &staff_token, "gwen_after_remove").await;
    let response = client
        .post(format!("{}/books/{}/lend", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", other_token))
        .send()
        .await
        .expect("Failed to lend");
    assert_eq!(response.status(), 201);
}

/// The available-books listing tracks the lend/return cycle.
#[tokio::test]
#[ignore]
async fn test_available_books_listing() {
    let client = Client::new();
    let staff_token = get_auth_token(&client, "admin", "admin").await;
    let patron_token = create_patron(&client, &staff_token, "patron_avail").await;

    let isbn = fresh_isbn(5);
    let (_, book_id) = create_author_and_book(
        &client,
        &staff_token,
        ("Mary", "Shelley"),
        "Frankenstein",
        &isbn,
    )
    .await;

    let contains_book = |body: &Value| {
        body.as_array()
            .unwrap()
            .iter()
            .any(|b| b["id"].as_i64() == Some(book_id))
    };

    let body: Value = client
        .get(format!("{}/books/available", BASE_URL))
        .send()
        .await
        .expect("Failed to list available")
        .json()
        .await
        .expect("Failed to parse response");
    assert!(contains_book(&body));

    let response = client
        .post(format!("{}/books/{}/lend", BASE_URL, book_id))
        .header("Authorization", format!("Bearer {}", patron_token))
        .send()
        .await
        .expect("Failed to lend");
    assert_eq!(response.status(), 201);

    let body: Value = client
        .get(format!("{}/books/available", BASE_URL))
        .send()
        .await
        .expect("Failed to list available")
        .json()
        .await
        .expect("Failed to parse response");
    assert!(!contains_book(&body));
}
