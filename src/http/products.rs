//! Product catalog handlers.
//!
//! Create and update arrive as multipart forms because they carry an image
//! file alongside the fields. Reads are public; mutations require the
//! operator role.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::Operator;
use crate::domain::product::Product;
use crate::error::{errmsg, Error, Result};
use crate::services::ProductInput;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    message: String,
    product: Product,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: String,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog.list().await?))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    let id = parse_product_id(&id)?;
    Ok(Json(state.catalog.get(id).await?))
}

pub async fn create(
    _operator: Operator,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    let form = ProductForm::parse(multipart).await?;
    let input = form.input()?;
    let (file_name, bytes) = form
        .image
        .ok_or_else(|| Error::Validation(errmsg::FIELDS_REQUIRED.to_string()))?;

    let stored = state.images.save(&file_name, &bytes).await?;
    let product = match state.catalog.create(input, stored.clone()).await {
        Ok(product) => product,
        Err(err) => {
            // the record never landed; don't leave the file behind
            state.images.delete(&stored).await;
            return Err(err);
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            message: "Product created.".to_string(),
            product,
        }),
    ))
}

pub async fn update(
    _operator: Operator,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ProductResponse>> {
    let id = parse_product_id(&id)?;
    let form = ProductForm::parse(multipart).await?;
    let input = form.input()?;

    let stored = match form.image {
        Some((file_name, bytes)) => Some(state.images.save(&file_name, &bytes).await?),
        None => None,
    };

    match state.catalog.update(id, input, stored.clone()).await {
        Ok((product, displaced)) => {
            if let Some(old) = displaced {
                state.images.delete(&old).await;
            }
            Ok(Json(ProductResponse {
                message: "Product updated.".to_string(),
                product,
            }))
        }
        Err(err) => {
            if let Some(stored) = stored {
                state.images.delete(&stored).await;
            }
            Err(err)
        }
    }
}

pub async fn remove(
    _operator: Operator,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let id = parse_product_id(&id)?;
    let product = state.catalog.delete(id).await?;
    state.images.delete(&product.image).await;

    Ok(Json(MessageResponse {
        message: "Product deleted.".to_string(),
    }))
}

/// Ids arrive as opaque path segments; anything that does not parse is
/// just an id that matches nothing.
fn parse_product_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| Error::NotFound(errmsg::PRODUCT_NOT_FOUND.to_string()))
}

/// Collected multipart fields for create/update.
struct ProductForm {
    name: Option<String>,
    category: Option<String>,
    price: Option<Decimal>,
    stock: Option<i64>,
    image: Option<(String, Vec<u8>)>,
}

impl ProductForm {
    async fn parse(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self {
            name: None,
            category: None,
            price: None,
            stock: None,
            image: None,
        };

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| Error::Validation(errmsg::INVALID_FORM.to_string()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                "name" => form.name = Some(read_text(field).await?),
                "category" => form.category = Some(read_text(field).await?),
                "price" => {
                    let text = read_text(field).await?;
                    form.price = Some(
                        text.trim()
                            .parse()
                            .map_err(|_| Error::Validation(errmsg::INVALID_PRICE.to_string()))?,
                    );
                }
                "stock" => {
                    let text = read_text(field).await?;
                    form.stock = Some(
                        text.trim()
                            .parse()
                            .map_err(|_| Error::Validation(errmsg::INVALID_STOCK.to_string()))?,
                    );
                }
                "image" => {
                    let file_name = field
                        .file_name()
                        .unwrap_or("upload")
                        .to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|_| Error::Validation(errmsg::INVALID_FORM.to_string()))?;
                    form.image = Some((file_name, bytes.to_vec()));
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// All four scalar fields are required on both create and update.
    fn input(&self) -> Result<ProductInput> {
        match (&self.name, &self.category, self.price, self.stock) {
            (Some(name), Some(category), Some(price), Some(stock)) => Ok(ProductInput {
                name: name.clone(),
                category: category.clone(),
                price,
                stock,
            }),
            _ => Err(Error::Validation(errmsg::FIELDS_REQUIRED.to_string())),
        }
    }
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|_| Error::Validation(errmsg::INVALID_FORM.to_string()))
}
