use iced::widget::text;
use iced::{Element, Pixels};

pub fn logo<'a, Message>(size: impl Into<Pixels>) -> Element<'a, Message> {
    const PKG_NAME: &str = env!("CARGO_PKG_NAME");

    let mut name = String::with_capacity(PKG_NAME.len());
    name.push(
        PKG_NAME
            .chars()
            .next()
            .expect("Non-empty name")
            .to_ascii_uppercase(),
    );
    name.push_str(&PKG_NAME[1..]);

    text(name).size(size).into()
}

/// Text that may contain CJK titles.
pub fn title<'a>(content: &'a str) -> text::Text<'a> {
    text(content).shaping(text::Shaping::Advanced)
}
