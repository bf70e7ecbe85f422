// src/handlers/media.rs
// DOCUMENTATION: Static serving of normalized rental images
// PURPOSE: Expose the asset root under the same prefix stored in image references

use actix_files::Files;
use actix_web::web;

/// Mount `assets_base_path` at `/{media_url_prefix}`
/// DOCUMENTATION: Directory listing stays disabled; only stored files are served
pub fn config(media_url_prefix: &str, assets_base_path: &str) -> impl FnOnce(&mut web::ServiceConfig) {
    let mount = format!("/{}", media_url_prefix.trim_matches('/'));
    let root = assets_base_path.to_string();

    move |cfg: &mut web::ServiceConfig| {
        log::debug!("Serving rental media from {} at {}", root, mount);
        cfg.service(Files::new(&mount, root).use_etag(true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    #[actix_rt::test]
    async fn test_stored_image_is_served_under_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("abc")).unwrap();
        std::fs::write(dir.path().join("abc").join("1.jpg"), b"jpeg bytes").unwrap();

        let root = dir.path().to_string_lossy().into_owned();
        let app = test::init_service(App::new().configure(config("assets/rentals/", &root))).await;

        let req = test::TestRequest::get()
            .uri("/assets/rentals/abc/1.jpg")
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(&body[..], b"jpeg bytes");

        let req = test::TestRequest::get()
            .uri("/assets/rentals/abc/")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_ne!(resp.status(), StatusCode::OK);
    }
}
