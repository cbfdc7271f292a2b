// src/common/validators.rs

//! Regras de validação compartilhadas pela API (payloads JSON) e pelos
//! formulários HTML. Cada função segue a assinatura de `#[validate(custom)]`
//! e devolve um `ValidationError` cujo `code` é a chave de tradução.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::io::Cursor;
use validator::ValidationError;

pub const PRODUCT_NAME_MIN: usize = 3;
pub const PRODUCT_NAME_MAX: usize = 100;
pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 150;
pub const PASSWORD_MIN: usize = 8;
pub const AVATAR_MAX_BYTES: usize = 5 * 1024 * 1024;
pub const AVATAR_MIN_SIDE: u32 = 100;
pub const AVATAR_MAX_SIDE: u32 = 4000;

pub fn price_floor() -> Decimal {
    Decimal::new(1, 2)
}

pub fn price_ceiling() -> Decimal {
    Decimal::new(999_999_999, 2)
}

fn error(code: &'static str) -> ValidationError {
    ValidationError::new(code)
}

pub fn validate_product_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    let length = trimmed.chars().count();
    if trimmed.is_empty() {
        return Err(error("product_name_blank"));
    }
    if length < PRODUCT_NAME_MIN {
        let mut err = error("product_name_too_short");
        err.add_param("min".into(), &PRODUCT_NAME_MIN);
        return Err(err);
    }
    if length > PRODUCT_NAME_MAX {
        let mut err = error("product_name_too_long");
        err.add_param("max".into(), &PRODUCT_NAME_MAX);
        return Err(err);
    }
    Ok(())
}

pub fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price <= Decimal::ZERO {
        return Err(error("price_not_positive"));
    }
    if *price < price_floor() {
        let mut err = error("price_too_low");
        err.add_param("min".into(), &price_floor().to_string());
        return Err(err);
    }
    if *price > price_ceiling() {
        let mut err = error("price_too_high");
        err.add_param("max".into(), &price_ceiling().to_string());
        return Err(err);
    }
    Ok(())
}

pub fn validate_stock(stock: impl std::borrow::Borrow<i32>) -> Result<(), ValidationError> {
    if *stock.borrow() < 0 {
        return Err(error("stock_negative"));
    }
    Ok(())
}

/// Percentual de desconto: 0 < p <= 100.
pub fn validate_discount(percent: &Decimal) -> Result<(), ValidationError> {
    if *percent <= Decimal::ZERO || *percent > Decimal::ONE_HUNDRED {
        return Err(error("discount_out_of_range"));
    }
    Ok(())
}

/// Nome genérico (categorias, tags) com limites informados.
pub fn validate_name_length(name: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let length = name.trim().chars().count();
    if length < min || length > max {
        let mut err = error("name_length");
        err.add_param("min".into(), &min);
        err.add_param("max".into(), &max);
        return Err(err);
    }
    Ok(())
}

pub fn validate_category_name(name: &str) -> Result<(), ValidationError> {
    validate_name_length(name, 2, 100)
}

pub fn validate_tag_name(name: &str) -> Result<(), ValidationError> {
    validate_name_length(name, 2, 50)
}

/// Cor hexadecimal "#RRGGBB".
pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(error("color_invalid"));
    }
    Ok(())
}

/// Forma canônica da cor: maiúsculas.
pub fn normalize_color(color: &str) -> String {
    color.trim().to_ascii_uppercase()
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '+'))
        .collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(error("phone_invalid"));
    }
    if !(10..=15).contains(&digits.len()) {
        return Err(error("phone_length"));
    }
    Ok(())
}

pub fn validate_website(url: &str) -> Result<(), ValidationError> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.contains(char::is_whitespace) => Ok(()),
        _ => Err(error("website_invalid")),
    }
}

pub fn validate_birth_date(date: &NaiveDate) -> Result<(), ValidationError> {
    if *date > Utc::now().date_naive() {
        return Err(error("birth_date_future"));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let length = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&length) {
        let mut err = error("username_length");
        err.add_param("min".into(), &USERNAME_MIN);
        err.add_param("max".into(), &USERNAME_MAX);
        return Err(err);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(error("username_invalid"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < PASSWORD_MIN {
        let mut err = error("password_too_short");
        err.add_param("min".into(), &PASSWORD_MIN);
        return Err(err);
    }
    Ok(())
}

/// Verifica tamanho e dimensões de um avatar enviado.
/// Lê apenas o cabeçalho da imagem; não decodifica os pixels.
pub fn validate_image(bytes: &[u8]) -> Result<(u32, u32), ValidationError> {
    if bytes.len() > AVATAR_MAX_BYTES {
        let mut err = error("image_too_large");
        err.add_param("max_mb".into(), &(AVATAR_MAX_BYTES / (1024 * 1024)));
        return Err(err);
    }

    let (width, height) = image::io::Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok())
        .ok_or_else(|| error("image_invalid"))?;

    if width < AVATAR_MIN_SIDE || height < AVATAR_MIN_SIDE {
        let mut err = error("image_dimensions_too_small");
        err.add_param("min".into(), &AVATAR_MIN_SIDE);
        err.add_param("width".into(), &width);
        err.add_param("height".into(), &height);
        return Err(err);
    }
    if width > AVATAR_MAX_SIDE || height > AVATAR_MAX_SIDE {
        let mut err = error("image_dimensions_too_large");
        err.add_param("max".into(), &AVATAR_MAX_SIDE);
        err.add_param("width".into(), &width);
        err.add_param("height".into(), &height);
        return Err(err);
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn code(result: Result<(), ValidationError>) -> String {
        result.unwrap_err().code.to_string()
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut buffer = Vec::new();
        img.write_to(&mut buffer, image::ImageOutputFormat::Png).unwrap();
        buffer
    }

    #[test]
    fn product_name_rules() {
        assert!(validate_product_name("Laptop").is_ok());
        assert_eq!(code(validate_product_name("   ")), "product_name_blank");
        assert_eq!(code(validate_product_name(" ab ")), "product_name_too_short");
        assert_eq!(code(validate_product_name(&"x".repeat(101))), "product_name_too_long");
    }

    #[test]
    fn price_rules() {
        assert!(validate_price(&Decimal::from_str("99.99").unwrap()).is_ok());
        assert_eq!(code(validate_price(&Decimal::ZERO)), "price_not_positive");
        assert_eq!(code(validate_price(&Decimal::from_str("-1").unwrap())), "price_not_positive");
        assert_eq!(code(validate_price(&Decimal::from_str("0.001").unwrap())), "price_too_low");
        assert_eq!(code(validate_price(&Decimal::from_str("10000000").unwrap())), "price_too_high");
        assert!(validate_price(&price_ceiling()).is_ok());
    }

    #[test]
    fn stock_and_discount_rules() {
        assert!(validate_stock(&0).is_ok());
        assert_eq!(code(validate_stock(&-1)), "stock_negative");
        assert!(validate_discount(&Decimal::TEN).is_ok());
        assert!(validate_discount(&Decimal::ZERO).is_err());
        assert!(validate_discount(&Decimal::ONE_HUNDRED).is_ok());
        assert!(validate_discount(&Decimal::from(101)).is_err());
    }

    #[test]
    fn color_rules() {
        assert!(validate_color("#1a2B3c").is_ok());
        assert_eq!(code(validate_color("#12345")), "color_invalid");
        assert_eq!(code(validate_color("123456")), "color_invalid");
        assert_eq!(code(validate_color("#GGGGGG")), "color_invalid");
        assert_eq!(normalize_color(" #ff00aa "), "#FF00AA");
    }

    #[test]
    fn phone_rules() {
        assert!(validate_phone("+55 (11) 98765-4321").is_ok());
        assert_eq!(code(validate_phone("12345")), "phone_length");
        assert_eq!(code(validate_phone("11 9abc-1234")), "phone_invalid");
    }

    #[test]
    fn website_rules() {
        assert!(validate_website("https://example.com").is_ok());
        assert!(validate_website("http://example.com/path").is_ok());
        assert_eq!(code(validate_website("ftp://example.com")), "website_invalid");
        assert_eq!(code(validate_website("https://")), "website_invalid");
    }

    #[test]
    fn birth_date_cannot_be_in_the_future() {
        let tomorrow = Utc::now().date_naive() + chrono::Duration::days(1);
        assert_eq!(code(validate_birth_date(&tomorrow)), "birth_date_future");
        assert!(validate_birth_date(&NaiveDate::from_ymd_opt(1990, 5, 17).unwrap()).is_ok());
    }

    #[test]
    fn username_and_password_rules() {
        assert!(validate_username("alice_01").is_ok());
        assert_eq!(code(validate_username("al")), "username_length");
        assert_eq!(code(validate_username("alice smith")), "username_invalid");
        assert!(validate_password("password123").is_ok());
        assert_eq!(code(validate_password("short")), "password_too_short");
    }

    #[test]
    fn image_dimensions_are_checked() {
        assert_eq!(validate_image(&png(200, 150)).unwrap(), (200, 150));
        assert_eq!(
            validate_image(&png(50, 200)).unwrap_err().code,
            "image_dimensions_too_small"
        );
        assert_eq!(validate_image(b"not an image").unwrap_err().code, "image_invalid");
    }

    #[test]
    fn oversized_upload_is_rejected_before_decoding() {
        let bytes = vec![0u8; AVATAR_MAX_BYTES + 1];
        assert_eq!(validate_image(&bytes).unwrap_err().code, "image_too_large");
    }
}
