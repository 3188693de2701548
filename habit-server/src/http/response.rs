//! Success envelopes
//!
//! Single values render as `{"data": ...}`; pages add the paging numbers
//! next to `data`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use habit_core::models::Paginated;
use serde::Serialize;

#[derive(Serialize)]
struct DataBody<T> {
    data: T,
}

/// `{"data": T}`
#[derive(Debug)]
pub struct Data<T>(pub T);

impl<T: Serialize> IntoResponse for Data<T> {
    fn into_response(self) -> Response {
        Json(DataBody { data: self.0 }).into_response()
    }
}

/// `201 Created` with `{"data": T}`
pub struct Created<T>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Data(self.0)).into_response()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageBody<T> {
    data: Vec<T>,
    total: i64,
    page: u32,
    per_page: u32,
    total_pages: u32,
    has_next: bool,
}

/// One page of a list endpoint
pub struct Page<T>(pub Paginated<T>);

impl<T: Serialize> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        let total_pages = self.0.total_pages();
        let has_next = self.0.has_next();
        let Paginated {
            items,
            total,
            page,
            per_page,
        } = self.0;
        Json(PageBody {
            data: items,
            total,
            page,
            per_page,
            total_pages,
            has_next,
        })
        .into_response()
    }
}
