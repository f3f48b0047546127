use iced::widget::{Text, text};

pub fn heart<'a>() -> Text<'a> {
    icon("\u{2665}")
}

pub fn play<'a>() -> Text<'a> {
    icon("\u{25B6}")
}

pub fn check<'a>() -> Text<'a> {
    icon("\u{2714}")
}

pub fn pause<'a>() -> Text<'a> {
    icon("\u{23F8}")
}

pub fn cross<'a>() -> Text<'a> {
    icon("\u{2716}")
}

pub fn expanded<'a>() -> Text<'a> {
    icon("\u{25B2}")
}

pub fn collapsed<'a>() -> Text<'a> {
    icon("\u{25BC}")
}

pub fn add<'a>() -> Text<'a> {
    icon("+")
}

pub fn search<'a>() -> Text<'a> {
    icon("\u{2315}")
}

pub fn reload<'a>() -> Text<'a> {
    icon("\u{21BB}")
}

pub fn alert<'a>() -> Text<'a> {
    icon("!")
}

fn icon(codepoint: &str) -> Text<'_> {
    text(codepoint).shaping(text::Shaping::Advanced)
}
