mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use futures::future::join_all;
use serde_json::json;
use uuid::Uuid;

use shared::{Reservation, ReservationItem};
use storefront_service::store::Store;

#[tokio::test]
async fn cart_writes_create_an_aggregated_hold() {
    let app = common::test_app();
    let bowl = app.seed_product("Vegan Buddha Bowl", "11.49", Some(10)).await;
    let user = Uuid::new_v4();
    let token = app.token_for(user);

    // two lines for the same product, different customizations
    let payload = json!({
        "items": [
            {"productId": bowl.id, "meal": {"name": bowl.name, "price": "11.49"}, "quantity": 2,
             "customizations": {"dressing": "tahini"}},
            {"productId": bowl.id, "meal": {"name": bowl.name, "price": "11.49"}, "quantity": 1,
             "customizations": {"dressing": "peanut"}}
        ]
    });
    let (status, _) = app
        .request("POST", "/api/cart", Some(&token), Some(payload))
        .await;
    assert_eq!(status, StatusCode::OK);

    let hold = app
        .store
        .get_reservation(user, Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hold.items.len(), 1);
    assert_eq!(hold.items[0].product_id, bowl.id);
    assert_eq!(hold.items[0].quantity, 3);
}

#[tokio::test]
async fn every_cart_read_slides_the_reservation_window() {
    let app = common::test_app();
    let bowl = app.seed_product("Vegan Buddha Bowl", "11.49", Some(10)).await;
    let user = Uuid::new_v4();
    let token = app.token_for(user);

    let payload = json!({
        "items": [{"productId": bowl.id, "meal": {"name": bowl.name, "price": "11.49"}, "quantity": 1}]
    });
    app.request("POST", "/api/cart", Some(&token), Some(payload))
        .await;
    let first = app
        .store
        .get_reservation(user, Utc::now())
        .await
        .unwrap()
        .unwrap()
        .expires_at;

    // a plain read leaves the cart alone but still pushes the expiry out
    app.request("GET", "/api/cart", Some(&token), None).await;
    let second = app
        .store
        .get_reservation(user, Utc::now())
        .await
        .unwrap()
        .unwrap()
        .expires_at;

    assert!(second > first);
}

#[tokio::test]
async fn emptying_the_cart_releases_the_hold() {
    let app = common::test_app();
    let bowl = app.seed_product("Vegan Buddha Bowl", "11.49", Some(10)).await;
    let user = Uuid::new_v4();
    let token = app.token_for(user);

    let payload = json!({
        "items": [{"productId": bowl.id, "meal": {"name": bowl.name, "price": "11.49"}, "quantity": 2}]
    });
    app.request("POST", "/api/cart", Some(&token), Some(payload.clone()))
        .await;
    app.request(
        "DELETE",
        &format!("/api/cart/remove/{}", bowl.id),
        Some(&token),
        None,
    )
    .await;
    assert!(app
        .store
        .get_reservation(user, Utc::now())
        .await
        .unwrap()
        .is_none());

    app.request("POST", "/api/cart", Some(&token), Some(payload))
        .await;
    app.request("DELETE", "/api/cart/clear", Some(&token), None)
        .await;
    assert!(app
        .store
        .get_reservation(user, Utc::now())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn a_user_holds_at_most_one_reservation() {
    let app = common::test_app();
    let bowl = app.seed_product("Vegan Buddha Bowl", "11.49", Some(10)).await;
    let user = Uuid::new_v4();
    let token = app.token_for(user);

    let small = json!({
        "items": [{"productId": bowl.id, "meal": {"name": bowl.name, "price": "11.49"}, "quantity": 1}]
    });
    app.request("POST", "/api/cart", Some(&token), Some(small))
        .await;

    let bigger = json!({
        "items": [{"productId": bowl.id, "meal": {"name": bowl.name, "price": "11.49"}, "quantity": 4}]
    });
    app.request("POST", "/api/cart", Some(&token), Some(bigger))
        .await;

    let hold = app
        .store
        .get_reservation(user, Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hold.items, vec![ReservationItem {
        product_id: bowl.id,
        quantity: 4,
    }]);
}

#[tokio::test]
async fn concurrent_same_user_cart_writes_are_last_write_wins() {
    let app = common::test_app();
    let bowl = app.seed_product("Vegan Buddha Bowl", "11.49", Some(10)).await;
    let wrap = app.seed_product("Paneer Tikka Wrap", "9.99", Some(10)).await;
    let user = Uuid::new_v4();

    // two devices push different carts for the same user at the same time
    let from_phone = json!({
        "items": [{"productId": bowl.id, "meal": {"name": bowl.name, "price": "11.49"}, "quantity": 2}]
    });
    let from_laptop = json!({
        "items": [{"productId": wrap.id, "meal": {"name": wrap.name, "price": "9.99"}, "quantity": 3}]
    });

    let mut tasks = Vec::new();
    for payload in [from_phone, from_laptop] {
        let router = app.router.clone();
        let token = app.token_for(user);
        tasks.push(tokio::spawn(async move {
            let (status, _) =
                common::send(router, "POST", "/api/cart", Some(&token), Some(payload)).await;
            status
        }));
    }
    for status in join_all(tasks).await {
        assert_eq!(status.unwrap(), StatusCode::OK);
    }

    // carts are written as whole documents, so one submission survives
    // intact; the lines never blend
    let cart = app.store.get_cart(user).await.unwrap().unwrap();
    assert_eq!(cart.items.len(), 1);
    let line = &cart.items[0];
    let phone_won = line.meal.id == Some(bowl.id) && line.quantity == 2;
    let laptop_won = line.meal.id == Some(wrap.id) && line.quantity == 3;
    assert!(phone_won || laptop_won);
}

#[tokio::test]
async fn a_users_own_hold_never_caps_their_cart() {
    let app = common::test_app();
    let combo = app.seed_product("Masala Dosa Combo", "10.49", Some(5)).await;
    let user = Uuid::new_v4();
    let token = app.token_for(user);

    let payload = json!({
        "items": [{"productId": combo.id, "meal": {"name": combo.name, "price": "10.49"}, "quantity": 5}]
    });
    let (_, first) = app
        .request("POST", "/api/cart", Some(&token), Some(payload))
        .await;
    assert!(first["warnings"].as_array().unwrap().is_empty());

    // the whole stock is now held by this user; re-reading must not clamp
    let (_, second) = app.request("GET", "/api/cart", Some(&token), None).await;
    assert!(second["warnings"].as_array().unwrap().is_empty());
    assert_eq!(second["cart"]["items"][0]["quantity"], 5);
}

#[tokio::test]
async fn expired_holds_free_stock_for_other_carts() {
    let app = common::test_app();
    let combo = app.seed_product("Masala Dosa Combo", "10.49", Some(2)).await;
    let shopper = Uuid::new_v4();
    let token = app.token_for(shopper);
    let rival = Uuid::new_v4();

    app.store
        .upsert_reservation(&Reservation::for_cart(
            rival,
            vec![ReservationItem {
                product_id: combo.id,
                quantity: 2,
            }],
            Utc::now(),
        ))
        .await
        .unwrap();

    let payload = json!({
        "items": [{"productId": combo.id, "meal": {"name": combo.name, "price": "10.49"}, "quantity": 2}]
    });
    let (_, blocked) = app
        .request("POST", "/api/cart", Some(&token), Some(payload.clone()))
        .await;
    assert!(blocked["cart"]["items"].as_array().unwrap().is_empty());
    assert_eq!(blocked["warnings"][0]["code"], "OUT_OF_STOCK");

    // the rival walked away and their hold lapsed
    app.store
        .upsert_reservation(&Reservation {
            user_id: rival,
            items: vec![ReservationItem {
                product_id: combo.id,
                quantity: 2,
            }],
            expires_at: Utc::now() - Duration::minutes(1),
        })
        .await
        .unwrap();

    let (_, freed) = app
        .request("POST", "/api/cart", Some(&token), Some(payload))
        .await;
    assert!(freed["warnings"].as_array().unwrap().is_empty());
    assert_eq!(freed["cart"]["items"][0]["quantity"], 2);
}
