use crate::bangumi::Session;

use iced::border;
use iced::widget::{center, container, horizontal_space, image, pop, text};
use iced::{ContentFit, Element, Fill, Task};

use bytes::Bytes;
use function::Binary;
use futures_util::TryFutureExt;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use tokio::fs;
use tokio::task;

#[derive(Clone)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub rgba: Bytes,
}

impl Image {
    pub fn fetch(
        url: &str,
        session: &Session,
    ) -> impl Future<Output = Result<Image, anywho::Error>> + 'static {
        let url = url.to_owned();
        let session = session.clone();

        async move {
            let cache = cache_dir().join(cache_key(&url));

            let fetch_from_cache = async {
                let bytes = fs::read(&cache).await?;

                Ok(Bytes::from(bytes))
            };

            let download_image = async {
                let bytes = session.download(&url).await?;

                Ok::<_, anywho::Error>(bytes)
            };

            let bytes = fetch_from_cache
                .or_else(|_: anywho::Error| download_image)
                .await?;

            if !fs::try_exists(&cache).await.unwrap_or_default() {
                let _ = fs::create_dir_all(cache.parent().unwrap_or(&cache)).await;
                let _ = fs::write(&cache, &bytes).await;
            }

            // Decode image as RGBA in a background blocking thread
            let image = task::spawn_blocking(move || decode(bytes)).await?;

            if image.is_err() {
                // Unreadable entries are downloaded again next time
                let _ = fs::remove_file(&cache).await;
            }

            image
        }
    }
}

fn decode(bytes: Bytes) -> Result<Image, anywho::Error> {
    let image = ::image::ImageReader::new(io::Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?
        .to_rgba8();

    Ok(Image {
        width: image.width(),
        height: image.height(),
        rgba: Bytes::from(image.into_raw()),
    })
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rgba", &self.rgba.len())
            .finish()
    }
}

/// The outcome of fetching the cover at some URL.
#[derive(Debug, Clone)]
pub struct Fetched(String, Result<Image, anywho::Error>);

/// Cover images of a screen, fetched lazily the first time they are shown.
#[derive(Default)]
pub struct Covers {
    images: HashMap<String, State>,
}

enum State {
    Loading,
    Loaded(image::Handle),
    Errored,
}

impl Covers {
    pub fn request(&mut self, url: &str, session: &Session) -> Task<Fetched> {
        if url.is_empty() || self.images.contains_key(url) {
            return Task::none();
        }

        let _ = self.images.insert(url.to_owned(), State::Loading);

        Task::perform(Image::fetch(url, session), Fetched.with(url.to_owned()))
    }

    pub fn update(&mut self, fetched: Fetched) {
        let Fetched(url, result) = fetched;

        let state = match result {
            Ok(image) => State::Loaded(image::Handle::from_rgba(
                image.width,
                image.height,
                image.rgba,
            )),
            Err(error) => {
                log::error!("{error}");

                State::Errored
            }
        };

        let _ = self.images.insert(url, state);
    }

    /// Displays the cover at `url`, producing `on_show` once it becomes visible.
    pub fn view<'a, Message: Clone + 'a>(
        &'a self,
        url: &'a str,
        on_show: Message,
    ) -> Element<'a, Message> {
        if url.is_empty() {
            return placeholder();
        }

        let cover = match self.images.get(url) {
            Some(State::Loaded(handle)) => image(handle)
                .width(Fill)
                .height(Fill)
                .content_fit(ContentFit::Cover)
                .into(),
            Some(State::Errored) => placeholder(),
            Some(State::Loading) | None => slot(horizontal_space()),
        };

        pop(cover)
            .key(url)
            .on_show(move |_size| on_show.clone())
            .into()
    }
}

fn placeholder<'a, Message: 'a>() -> Element<'a, Message> {
    slot(center(text("No cover").size(12)))
}

fn slot<'a, Message: 'a>(content: impl Into<Element<'a, Message>>) -> Element<'a, Message> {
    container(content)
        .width(Fill)
        .height(Fill)
        .style(|theme| container::dark(theme).border(border::rounded(8)))
        .into()
}

/// A file name for the cover at `url`, percent-encoding every byte that is
/// not safe in a path.
fn cache_key(url: &str) -> String {
    let path = url.split_once("://").map_or(url, |(_, path)| path);

    path.bytes().fold(String::new(), |mut key, byte| {
        if byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'-' || byte == b'_' {
            key.push(char::from(byte));
        } else {
            key.push_str(&format!("%{byte:02X}"));
        }

        key
    })
}

fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_default()
        .join(env!("CARGO_PKG_NAME"))
        .join("covers")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_a_flat_file_name() {
        assert_eq!(
            cache_key("https://lain.bgm.tv/pic/cover/c/c2/0a/876_6kGqg.jpg"),
            "lain.bgm.tv%2Fpic%2Fcover%2Fc%2Fc2%2F0a%2F876_6kGqg.jpg"
        );
    }

    #[test]
    fn cache_key_distinguishes_resolutions() {
        assert_ne!(
            cache_key("https://lain.bgm.tv/pic/cover/l/c2/0a/876.jpg"),
            cache_key("https://lain.bgm.tv/pic/cover/c/c2/0a/876.jpg"),
        );
    }

    #[test]
    fn cache_key_keeps_separators_apart_from_underscores() {
        assert_ne!(
            cache_key("https://lain.bgm.tv/pic/a_b.jpg"),
            cache_key("https://lain.bgm.tv/pic/a/b.jpg"),
        );
        assert_ne!(
            cache_key("https://lain.bgm.tv/pic/a%2Fb.jpg"),
            cache_key("https://lain.bgm.tv/pic/a/b.jpg"),
        );
    }

    #[test]
    fn undecodable_bytes_are_an_error() {
        assert!(decode(Bytes::from_static(b"\xFF\xD8\xFF truncated")).is_err());
    }
}
