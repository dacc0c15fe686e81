//! `GET /brands`

use axum::Json;

use crate::api::types::Brand;

/// Static brand catalog shown on the client's home screen.
pub const BRANDS: &[Brand] = &[
    Brand {
        name: "Toyota",
        logo_url: "https://example.com/toyota.png",
    },
    Brand {
        name: "Honda",
        logo_url: "https://example.com/honda.png",
    },
    Brand {
        name: "BMW",
        logo_url: "https://example.com/bmw.png",
    },
    Brand {
        name: "Mercedes",
        logo_url: "https://example.com/mercedes.png",
    },
    Brand {
        name: "Audi",
        logo_url: "https://example.com/audi.png",
    },
];

pub async fn list() -> Json<&'static [Brand]> {
    Json(BRANDS)
}
