//! Header menu, role gates, and public pages.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use ocop_integration_tests::{TestContext, location};

/// Menu labels in header order.
fn menu_labels(html: &str) -> Vec<String> {
    let nav_start = html.find(r#"<nav class="site-nav""#).unwrap();
    let nav_end = nav_start + html[nav_start..].find("</nav>").unwrap();
    let nav = &html[nav_start..nav_end];

    let mut labels = Vec::new();
    for chunk in nav.split("<li>").skip(1) {
        let item = &chunk[..chunk.find("</li>").unwrap()];
        let mut text = String::new();
        let mut in_tag = false;
        for c in item.chars() {
            match c {
                '<' => in_tag = true,
                '>' => in_tag = false,
                _ if !in_tag => text.push(c),
                _ => {}
            }
        }
        labels.push(text.trim().to_string());
    }
    labels
}

#[tokio::test]
async fn test_anonymous_menu() {
    let ctx = TestContext::spawn().await;

    let body = ctx.page("/").await;
    assert_eq!(menu_labels(&body), ["Login", "Register"]);
}

#[tokio::test]
async fn test_admin_menu() {
    let ctx = TestContext::spawn().await;
    ctx.login("admin@ocop.vn", "matkhau-admin").await;

    let body = ctx.page("/").await;
    assert_eq!(menu_labels(&body), ["Account", "Admin dashboard", "Logout"]);
    assert!(body.contains(r#"<small class="role">Administrator</small>"#));
}

#[tokio::test]
async fn test_user_menu() {
    let ctx = TestContext::spawn().await;
    ctx.login("lan@ocop.vn", "matkhau-lan").await;

    let body = ctx.page("/").await;
    assert_eq!(menu_labels(&body), ["Account", "Open a store", "Logout"]);
}

#[tokio::test]
async fn test_seller_menu_links_to_portal() {
    let ctx = TestContext::spawn().await;
    ctx.login("seller@ocop.vn", "matkhau-seller").await;

    let body = ctx.page("/").await;
    assert_eq!(menu_labels(&body), ["Account", "My store", "Logout"]);
    assert!(body.contains(r#"href="https://seller.ocop.vn""#));
}

#[tokio::test]
async fn test_logout_is_a_post_form() {
    let ctx = TestContext::spawn().await;
    ctx.login("lan@ocop.vn", "matkhau-lan").await;

    let body = ctx.page("/").await;
    assert!(body.contains(r#"<form action="/auth/logout" method="post""#));
}

#[tokio::test]
async fn test_admin_page_requires_admin() {
    let ctx = TestContext::spawn().await;

    let response = ctx.get("/admin").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/auth/login");

    ctx.login("lan@ocop.vn", "matkhau-lan").await;
    let response = ctx.get("/admin").await;
    assert_eq!(response.status(), 303);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_home_lists_featured_products() {
    let ctx = TestContext::spawn().await;

    let body = ctx.page("/").await;
    assert!(body.contains("Tra Shan Tuyet"));
    assert!(body.contains("120.000 ₫"));
    assert!(body.contains("1.250.000 ₫"));
}

#[tokio::test]
async fn test_search_page() {
    let ctx = TestContext::spawn().await;

    let body = ctx.page("/search?q=mat").await;
    assert!(body.contains("Mat ong rung U Minh"));
    assert!(!body.contains("Nuoc mam Phu Quoc"));
}

#[tokio::test]
async fn test_search_suggestions() {
    let ctx = TestContext::spawn().await;

    let body = ctx.page("/search/suggest?q=tra").await;
    assert!(body.contains("Tra Shan Tuyet"));
    assert!(body.contains(r#"href="/search?q=tra""#));

    // One character is not enough to search.
    let body = ctx.page("/search/suggest?q=t").await;
    assert!(!body.contains("<li"));
}

#[tokio::test]
async fn test_security_headers_and_health() {
    let ctx = TestContext::spawn().await;

    let response = ctx.get("/").await;
    let headers = response.headers();
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("content-security-policy").is_some());
    assert!(headers.get("x-request-id").is_some());

    let response = ctx.get("/health").await;
    assert_eq!(response.status(), 200);
    let response = ctx.get("/health/ready").await;
    assert_eq!(response.status(), 200);
}
