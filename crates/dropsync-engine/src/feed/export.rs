//! Google-Shopping-style RSS rendering of generated feed items.

use dropsync_core::{Feed, FeedItem};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::FeedError;

const GOOGLE_NS: &str = "http://base.google.com/ns/1.0";

/// Additional images beyond the first, per item.
const MAX_ADDITIONAL_IMAGES: usize = 10;

fn export_err(e: impl std::fmt::Display) -> FeedError {
    FeedError::Export(e.to_string())
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    text: &str,
) -> Result<(), FeedError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(export_err)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(export_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(export_err)?;
    Ok(())
}

fn write_item(writer: &mut Writer<Vec<u8>>, item: &FeedItem) -> Result<(), FeedError> {
    writer
        .write_event(Event::Start(BytesStart::new("item")))
        .map_err(export_err)?;

    write_text_element(writer, "g:id", &item.sku)?;
    write_text_element(writer, "title", &item.title)?;
    write_text_element(writer, "description", &item.description)?;
    write_text_element(writer, "g:product_type", &item.category)?;
    write_text_element(
        writer,
        "g:price",
        &format!("{} {}", item.price.round_dp(2), item.currency),
    )?;
    write_text_element(writer, "g:availability", &item.availability)?;

    let mut images = item.image_urls.iter();
    if let Some(first) = images.next() {
        write_text_element(writer, "g:image_link", first)?;
    }
    for extra in images.take(MAX_ADDITIONAL_IMAGES) {
        write_text_element(writer, "g:additional_image_link", extra)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("item")))
        .map_err(export_err)?;
    Ok(())
}

/// Renders `items` as an RSS 2.0 document in the Google Merchant namespace.
///
/// # Errors
///
/// Returns [`FeedError::Export`] if the XML cannot be written.
pub fn render_rss(feed: &Feed, items: &[FeedItem]) -> Result<String, FeedError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(export_err)?;
    writer
        .write_event(Event::Start(
            BytesStart::new("rss").with_attributes([("version", "2.0"), ("xmlns:g", GOOGLE_NS)]),
        ))
        .map_err(export_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("channel")))
        .map_err(export_err)?;

    write_text_element(&mut writer, "title", &feed.name)?;
    write_text_element(
        &mut writer,
        "description",
        &format!("{} product feed", feed.platform),
    )?;
    for item in items {
        write_item(&mut writer, item)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("channel")))
        .map_err(export_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("rss")))
        .map_err(export_err)?;

    String::from_utf8(writer.into_inner()).map_err(export_err)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::*;

    fn feed() -> Feed {
        Feed {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Main & Co".to_string(),
            platform: "google_shopping".to_string(),
            title_template: "{{title}}".to_string(),
            description_template: "{{description}}".to_string(),
            max_title_length: 150,
            max_description_length: 5000,
        }
    }

    fn item(images: &[&str]) -> FeedItem {
        FeedItem {
            feed_id: Uuid::new_v4(),
            catalog_id: Uuid::new_v4(),
            sku: "S1".to_string(),
            title: "Case <black>".to_string(),
            description: "Fits most phones".to_string(),
            category: "Electronics > Phone Cases".to_string(),
            price: Decimal::new(125, 1),
            currency: "USD".to_string(),
            availability: "in_stock".to_string(),
            image_urls: images.iter().map(ToString::to_string).collect(),
            quality_score: 0.5,
        }
    }

    #[test]
    fn renders_channel_and_escapes_text() {
        let xml = render_rss(&feed(), &[item(&["https://cdn/a.jpg", "https://cdn/b.jpg"])])
            .unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("xmlns:g=\"http://base.google.com/ns/1.0\""));
        assert!(xml.contains("<title>Main &amp; Co</title>"));
        assert!(xml.contains("<title>Case &lt;black&gt;</title>"));
        assert!(xml.contains("<g:product_type>Electronics &gt; Phone Cases</g:product_type>"));
        assert!(xml.contains("<g:price>12.5 USD</g:price>"));
        assert!(xml.contains("<g:image_link>https://cdn/a.jpg</g:image_link>"));
        assert!(xml.contains("<g:additional_image_link>https://cdn/b.jpg</g:additional_image_link>"));
    }

    #[test]
    fn item_without_images_has_no_image_link() {
        let xml = render_rss(&feed(), &[item(&[])]).unwrap();
        assert!(!xml.contains("g:image_link"));
        assert_eq!(xml.matches("<item>").count(), 1);
    }

    #[test]
    fn empty_feed_is_a_valid_channel() {
        let xml = render_rss(&feed(), &[]).unwrap();
        assert!(xml.contains("<channel>"));
        assert!(xml.trim_end().ends_with("</rss>"));
    }
}
