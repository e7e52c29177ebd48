use crate::models::ReferenceProperty;
use crate::normalize::slugify;
use crate::scrapers::types::SearchParams;
use crate::scrapers::zap::BASE_URL;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters `encodeURIComponent` leaves alone
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Searches are pinned to Rio de Janeiro state
const STATE_SLUG: &str = "rj";

fn type_path(property_type: &str) -> String {
    if property_type.eq_ignore_ascii_case("apartamento") {
        "apartamentos".to_string()
    } else {
        format!("{}s", slugify(property_type))
    }
}

/// Listing-type filter value; only residential apartments are mapped so far
fn type_filter(_property_type: &str) -> &'static str {
    "apartamento_residencial"
}

fn join_range(values: &[u32]) -> String {
    values
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join("%2C")
}

/// The site's `onde` location token: street-level search inside a neighborhood
fn location_param(params: &SearchParams) -> String {
    let city = params.city.as_str();
    let neighborhood = params.neighborhood.as_str();
    let hierarchy = format!("BR>{city}>NULL>{city}>>{neighborhood}");
    let raw = [
        "",
        city,
        city,
        "",
        neighborhood,
        params.street.as_str(),
        "",
        "street",
        hierarchy.as_str(),
        "",
    ]
    .join(",");

    utf8_percent_encode(&raw, URI_COMPONENT)
        .to_string()
        .replace("%20", "+")
}

/// Build the Zap search URL for a reference property.
///
/// Price band is ±20% of the listed price, room filters run from the
/// property's count up to 4 and the area is matched exactly.
pub fn build_zap_url(property: &ReferenceProperty) -> String {
    build_search_url(&SearchParams::for_property(property))
}

pub fn build_search_url(params: &SearchParams) -> String {
    let base = format!(
        "{BASE_URL}/venda/{}/{STATE_SLUG}+{}/{}/",
        type_path(&params.property_type),
        slugify(&params.city),
        slugify(&params.street),
    );

    let mut query = vec![
        "transacao=venda".to_string(),
        format!("onde={}", location_param(params)),
        format!("tipos={}", type_filter(&params.property_type)),
        format!("banheiros={}", join_range(&params.bathroom_range())),
        format!("quartos={}", join_range(&params.bedroom_range())),
    ];
    if let Some(max) = params.max_price {
        query.push(format!("precoMaximo={max}"));
    }
    if let Some(min) = params.min_price {
        query.push(format!("precoMinimo={min}"));
    }
    if let Some(max) = params.max_sqm {
        query.push(format!("areaMaxima={max}"));
    }
    if let Some(min) = params.min_sqm {
        query.push(format!("areaMinima={min}"));
    }

    format!("{base}?{}", query.join("&"))
}
