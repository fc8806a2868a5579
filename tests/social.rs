//! Social Graph Tests
//!
//! Covers follow/unfollow rules, follower listings and relationships.

mod common;

use axum::http::StatusCode;
use common::app;
use futures::future::join_all;
use serde_json::json;
use uuid::Uuid;

use mutuals::app::social::SocialService;
use mutuals::app::ServiceError;

// ===========================================================================
// Follow / unfollow
// ===========================================================================

#[tokio::test]
async fn follow_user() {
    let Some(app) = app().await else { return };
    let user_a = app.create_user("soc_follow_a").await;
    let user_b = app.create_user("soc_follow_b").await;

    let resp = app
        .post_json(
            &format!("/v1/users/{}/follow", user_b.id),
            json!({}),
            Some(&user_a.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json(), json!({ "following": true }));
}

#[tokio::test]
async fn follow_already_following() {
    let Some(app) = app().await else { return };
    let user_a = app.create_user("soc_dup_a").await;
    let user_b = app.create_user("soc_dup_b").await;
    app.follow(&user_a, &user_b).await;

    let resp = app
        .post_json(
            &format!("/v1/users/{}/follow", user_b.id),
            json!({}),
            Some(&user_a.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.error_message(), "already following this user");
}

#[tokio::test]
async fn follow_self_is_rejected() {
    let Some(app) = app().await else { return };
    let user = app.create_user("soc_self").await;

    let resp = app
        .post_json(
            &format!("/v1/users/{}/follow", user.id),
            json!({}),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "cannot follow yourself");
}

#[tokio::test]
async fn follow_missing_user_is_not_found() {
    let Some(app) = app().await else { return };
    let user = app.create_user("soc_ghost").await;

    let resp = app
        .post_json(
            &format!("/v1/users/{}/follow", Uuid::new_v4()),
            json!({}),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "user not found");
}

#[tokio::test]
async fn unknown_identity_cannot_follow() {
    let Some(app) = app().await else { return };
    let target = app.create_user("soc_ghost_target").await;

    let resp = app
        .post_json(
            &format!("/v1/users/{}/follow", target.id),
            json!({}),
            Some(&app.ghost_token()),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "user not found");
}

#[tokio::test]
async fn unfollow_without_edge_is_not_found() {
    let Some(app) = app().await else { return };
    let user_a = app.create_user("soc_unf_a").await;
    let user_b = app.create_user("soc_unf_b").await;

    let resp = app
        .delete(
            &format!("/v1/users/{}/follow", user_b.id),
            Some(&user_a.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    app.follow(&user_a, &user_b).await;
    let resp = app
        .delete(
            &format!("/v1/users/{}/follow", user_b.id),
            Some(&user_a.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json(), json!({ "following": false }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_follows_create_one_edge() {
    let Some(app) = app().await else { return };
    let user_a = app.create_user("soc_race_a").await;
    let user_b = app.create_user("soc_race_b").await;

    let service = SocialService::new(app.state.db.clone());
    let handles = (0..5).map(|_| {
        let service = service.clone();
        let (a, b) = (user_a.id, user_b.id);
        tokio::spawn(async move { service.follow_user(a, b).await })
    });

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|err| matches!(err, ServiceError::Conflict(_))));

    let edges: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM follows WHERE follower_id = $1 AND following_id = $2",
    )
    .bind(user_a.id)
    .bind(user_b.id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(edges, 1);
}

// ===========================================================================
// Listings and relationship
// ===========================================================================

#[tokio::test]
async fn followers_and_following_lists() {
    let Some(app) = app().await else { return };
    let star = app.create_user("soc_star").await;
    let fan1 = app.create_user("soc_fan1").await;
    let fan2 = app.create_user("soc_fan2").await;
    app.follow(&fan1, &star).await;
    app.follow(&fan2, &star).await;

    let resp = app
        .get(&format!("/v1/users/{}/followers", star.id), Some(&fan1.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    let followers: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|edge| edge["user"]["username"].as_str().unwrap())
        .collect();
    assert_eq!(followers, vec![fan2.username.as_str(), fan1.username.as_str()]);

    let resp = app
        .get(&format!("/v1/users/{}/following", fan1.id), Some(&fan1.access_token))
        .await;
    let body = resp.json();
    let following = body["items"].as_array().unwrap();
    assert_eq!(following.len(), 1);
    assert_eq!(following[0]["user"]["id"].as_str().unwrap(), star.id.to_string());
    assert!(following[0]["followed_at"].is_string());
}

#[tokio::test]
async fn follower_list_paginates() {
    let Some(app) = app().await else { return };
    let star = app.create_user("soc_page_star").await;
    for n in 0..3 {
        let fan = app.create_user(&format!("soc_page_{}", n)).await;
        app.follow(&fan, &star).await;
    }

    let resp = app
        .get(
            &format!("/v1/users/{}/followers?limit=2", star.id),
            Some(&star.access_token),
        )
        .await;
    let body = resp.json();
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    let cursor = body["next_cursor"].as_str().unwrap().to_string();

    let resp = app
        .get(
            &format!("/v1/users/{}/followers?limit=2&cursor={}", star.id, cursor),
            Some(&star.access_token),
        )
        .await;
    let body = resp.json();
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert!(body.get("next_cursor").is_none());
}

#[tokio::test]
async fn relationship_reports_both_directions() {
    let Some(app) = app().await else { return };
    let user_a = app.create_user("soc_rel_a").await;
    let user_b = app.create_user("soc_rel_b").await;
    let path = format!("/v1/users/{}/relationship", user_b.id);

    app.follow(&user_a, &user_b).await;
    let resp = app.get(&path, Some(&user_a.access_token)).await;
    assert_eq!(
        resp.json(),
        json!({ "is_following": true, "is_followed_by": false, "is_mutual": false })
    );

    app.follow(&user_b, &user_a).await;
    let resp = app.get(&path, Some(&user_a.access_token)).await;
    assert_eq!(
        resp.json(),
        json!({ "is_following": true, "is_followed_by": true, "is_mutual": true })
    );
}
