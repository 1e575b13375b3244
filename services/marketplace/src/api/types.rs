//! HTTP API request/response types.
//!
//! # Purpose
//! Defines the response envelope, request payloads with their validation
//! rules, and composite response shapes used by the marketplace handlers.
use crate::model::{AdminRole, Product, PublicSeller, User};
use duka_authz::Role;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Envelope wrapping every successful (or success-shaped) response.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Reply<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Reply<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
            data: Some(data),
        }
    }

    /// Success-shaped reply without data, used for absent resources and
    /// no-op requests.
    pub fn notice(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
            data: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SystemInfo {
    pub service: String,
    pub api_version: String,
    pub storage_backend: String,
    pub image_backend: String,
    pub durable_storage: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RegisterUserRequest {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
    pub password: String,
    /// Base64 profile image.
    #[serde(default)]
    pub user_image: Option<String>,
}

impl RegisterUserRequest {
    pub fn validate(&self) -> Result<(), String> {
        require("first_name", &self.first_name)?;
        require("last_name", &self.last_name)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), String> {
        require("email", &self.email)?;
        require("password", &self.password)
    }
}

/// A freshly issued session.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SessionResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: i64,
    pub identity_id: String,
    #[schema(value_type = String)]
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RegisterAdminRequest {
    pub admin_name: String,
    pub email: String,
    #[serde(default)]
    pub cell: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<AdminRole>,
    #[serde(default)]
    pub admin_image: Option<String>,
}

impl RegisterAdminRequest {
    pub fn validate(&self) -> Result<(), String> {
        require("admin_name", &self.admin_name)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CreateCategoryRequest {
    pub category_name: String,
    #[serde(default)]
    pub category_image: Option<String>,
}

impl CreateCategoryRequest {
    pub fn validate(&self) -> Result<(), String> {
        require("category_name", &self.category_name)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CreateProductRequest {
    pub product_name: String,
    pub product_price: String,
    #[serde(default)]
    pub product_description: String,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub brand: String,
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    /// Base64 main image.
    pub main_image: String,
    /// Additional base64 gallery images.
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreateProductRequest {
    pub fn validate(&self) -> Result<(), String> {
        require("product_name", &self.product_name)?;
        validate_price(&self.product_price)?;
        require("category", &self.category)?;
        require("main_image", &self.main_image)?;
        if self.quantity < 0 {
            return Err("quantity must not be negative".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CreateAdvertRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    /// Base64 advert image.
    #[serde(default)]
    pub image: Option<String>,
}

impl CreateAdvertRequest {
    pub fn validate(&self) -> Result<(), String> {
        require("title", &self.title)
    }
}

/// Seller contact details shown alongside a product.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SellerSummary {
    pub seller_id: String,
    pub seller_name: String,
    pub seller_email: String,
    pub seller_phone: String,
    pub seller_location: String,
    pub user_image: String,
}

impl From<&User> for SellerSummary {
    fn from(user: &User) -> Self {
        Self {
            seller_id: user.user_id.clone(),
            seller_name: user.full_name(),
            seller_email: user.email.clone(),
            seller_phone: user.phone.clone(),
            seller_location: user.location.clone(),
            user_image: user.user_image.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ProductDetail {
    pub product: Product,
    /// Gallery image keys.
    pub images: Vec<String>,
    /// Base64 of the main image, when it could be loaded.
    pub main_image_data: Option<String>,
    pub seller: Option<SellerSummary>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SellerProfile {
    pub seller: PublicSeller,
    pub user_image_data: Option<String>,
}

fn require(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} is required"));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let valid = email
        .trim()
        .split_once('@')
        .map(|(local, domain)| {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
        })
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err("email is not valid".to_string())
    }
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    Ok(())
}

pub fn validate_price(price: &str) -> Result<(), String> {
    match price.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(()),
        _ => Err("product_price must be a non-negative decimal".to_string()),
    }
}
