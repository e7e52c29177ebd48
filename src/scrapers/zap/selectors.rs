//! `data-cy` hooks and CSS classes of zapimoveis.com.br result pages.

pub const RESULT_CARD: &str = r#"li[data-cy="rp-property-cd"]"#;

pub const CARD_LINK: &str = r#"a[role="button"]"#;
pub const LOCATION_TEXT: &str = r#"[data-cy="rp-cardProperty-location-txt"]"#;
pub const STREET_TEXT: &str = r#"[data-cy="rp-cardProperty-street-txt"]"#;
pub const PRICE_TEXT: &str = r#"[data-cy="rp-cardProperty-price-txt"]"#;
pub const AREA_TEXT: &str = r#"[data-cy="rp-cardProperty-propertyArea-txt"]"#;
pub const BEDROOMS_TEXT: &str = r#"[data-cy="rp-cardProperty-bedroomQuantity-txt"]"#;
pub const BATHROOMS_TEXT: &str = r#"[data-cy="rp-cardProperty-bathroomQuantity-txt"]"#;

pub const PHONE_BUTTON: &str = r#"[data-cy="rp-cardProperty-phone-btn"]"#;
pub const DEDUP_BUTTON: &str = r#"[data-cy="listing-card-deduplicated-button"]"#;

pub const CONTACT_DIALOG: &str = r#"[data-cy="contact-dialog"]"#;
pub const SELLER_TITLE: &str = ".ListingInfoSection-module__3f6Rqq__title";
pub const SELLER_INFO_LINES: &str =
    ".ListingInfoSection-module__3f6Rqq__additionalInfo .ListingInfoSection-module__3f6Rqq__info";

/// Info-line prefixes inside the contact dialog, as rendered by the site
pub const ADVERTISER_CODE_PREFIX: &str = "No anunciante:";
pub const ZAP_CODE_PREFIX: &str = "No Zap:";
