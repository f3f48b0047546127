use crate::bangumi::collection::Entry;
use crate::bangumi::{Category, Session};
use crate::cover::{self, Covers};
use crate::icon;
use crate::widget;

use iced::keyboard;
use iced::widget::{
    button, center, column, container, grid, horizontal_space, right, row, scrollable, stack, text,
};
use iced::{Center, Color, Element, Fill, Subscription, Task, Theme, border};

use std::collections::BTreeSet;

pub struct Shelf {
    user: String,
    state: State,
    collapsed: BTreeSet<Category>,
    covers: Covers,
}

enum State {
    Loading,
    Loaded(bangumi::Shelf),
}

#[derive(Debug, Clone)]
pub enum Message {
    Loaded(bangumi::Shelf),
    Reload,
    Toggle(Category),
    CoverShown(String),
    CoverFetched(cover::Fetched),
}

impl Shelf {
    pub fn new(user: &str, session: &Session) -> (Self, Task<Message>) {
        let shelf = Self {
            user: user.to_owned(),
            state: State::Loading,
            collapsed: BTreeSet::new(),
            covers: Covers::default(),
        };

        let task = shelf.fetch(session);

        (shelf, task)
    }

    pub fn update(&mut self, message: Message, session: &Session) -> Task<Message> {
        match message {
            Message::Loaded(shelf) => {
                log::info!(
                    "Loaded {total} collection entries of user {user}",
                    total = shelf.total(),
                    user = self.user
                );

                self.state = State::Loaded(shelf);

                Task::none()
            }
            Message::Reload => {
                if let State::Loading = self.state {
                    return Task::none();
                }

                self.state = State::Loading;
                self.collapsed.clear();

                self.fetch(session)
            }
            Message::Toggle(category) => {
                if !self.collapsed.remove(&category) {
                    let _ = self.collapsed.insert(category);
                }

                Task::none()
            }
            Message::CoverShown(url) => self
                .covers
                .request(&url, session)
                .map(Message::CoverFetched),
            Message::CoverFetched(fetched) => {
                self.covers.update(fetched);

                Task::none()
            }
        }
    }

    fn fetch(&self, session: &Session) -> Task<Message> {
        Task::perform(
            bangumi::Shelf::fetch(session, &self.user),
            Message::Loaded,
        )
    }

    pub fn view(&self) -> Element<'_, Message> {
        let header = row![
            text!("{user}'s collection", user = self.user).size(20),
            horizontal_space(),
            button(
                row![icon::reload().size(12), text("Reload").size(12)]
                    .spacing(5)
                    .align_y(Center)
            )
            .on_press_maybe(matches!(self.state, State::Loaded(_)).then_some(Message::Reload))
            .padding([5, 10]),
        ]
        .align_y(Center);

        let content: Element<_> = match &self.state {
            State::Loading => center(text("Loading collection...")).into(),
            State::Loaded(shelf) if shelf.is_unavailable() => {
                let error = shelf
                    .failures()
                    .next()
                    .map(|(_, error)| error.to_string())
                    .unwrap_or_default();

                center(
                    column![
                        icon::alert().size(30).style(text::danger),
                        text!("Could not load the collection: {error}").style(text::danger),
                        button(text("Retry").size(12))
                            .on_press(Message::Reload)
                            .padding([5, 10]),
                    ]
                    .spacing(10)
                    .align_x(Center),
                )
                .into()
            }
            State::Loaded(shelf) => {
                let failures = shelf.failures().map(|(category, error)| {
                    row![
                        icon::alert().size(12).style(text::danger),
                        text!("Could not load {category}: {error}")
                            .size(12)
                            .style(text::danger),
                        horizontal_space(),
                        button(text("Retry").size(12))
                            .on_press(Message::Reload)
                            .padding([2, 8]),
                    ]
                    .spacing(10)
                    .align_y(Center)
                    .into()
                });

                if shelf.is_empty() && shelf.failures().next().is_none() {
                    center(
                        text("This user's anime collection is empty")
                            .style(|theme: &Theme| text::Style {
                                color: Some(theme.extended_palette().background.strong.color),
                            }),
                    )
                    .into()
                } else {
                    let mut content: Vec<Element<_>> = failures.collect();

                    content.extend(
                        shelf
                            .sections()
                            .map(|(category, entries)| self.section(category, entries)),
                    );

                    scrollable(column(content).spacing(20).padding([0, 10]))
                        .height(Fill)
                        .spacing(10)
                        .into()
                }
            }
        };

        column![header, content].spacing(20).padding(10).into()
    }

    fn section<'a>(&'a self, category: Category, entries: &'a [Entry]) -> Element<'a, Message> {
        let is_collapsed = self.collapsed.contains(&category);

        let header = button(
            row![
                badge(category).size(18),
                text(category.to_string())
                    .size(18)
                    .style(move |theme: &Theme| tint(category, theme)),
                container(text!("{}", entries.len()).size(12))
                    .padding([2, 8])
                    .style(|theme| container::dark(theme).border(border::rounded(10))),
                horizontal_space(),
                (if is_collapsed {
                    icon::collapsed()
                } else {
                    icon::expanded()
                })
                .size(12),
            ]
            .spacing(10)
            .align_y(Center),
        )
        .on_press(Message::Toggle(category))
        .padding([8, 0])
        .style(button::text)
        .width(Fill);

        if is_collapsed {
            return header.into();
        }

        let cards = grid(entries.iter().map(|entry| self.card(entry)))
            .fluid(180)
            .height(grid::aspect_ratio(2, 4))
            .spacing(10);

        column![header, cards].spacing(10).into()
    }

    fn card<'a>(&'a self, entry: &'a Entry) -> Element<'a, Message> {
        let subject = &entry.subject;
        let url = subject.cover().unwrap_or_default();

        let episodes = {
            let total = match subject.episodes() {
                0 => "??".to_owned(),
                total => total.to_string(),
            };

            right(
                container(text!("{watched} / {total} eps", watched = entry.watched).size(10))
                    .padding([2, 6])
                    .style(|_theme| {
                        container::Style::default()
                            .background(Color::BLACK.scale_alpha(0.6))
                            .border(border::rounded(8))
                    }),
            )
            .padding(5)
        };

        let cover = stack![
            self.covers
                .view(url, Message::CoverShown(url.to_owned())),
            episodes
        ]
        .height(Fill);

        let category = entry.category;

        let status = row![
            badge(category).size(10),
            text(category.to_string()).size(10)
        ]
        .spacing(5)
        .align_y(Center);

        container(
            column![
                cover,
                widget::title(subject.display_name()).size(13),
            ]
            .push_maybe(subject.original_name().map(|name| {
                widget::title(name)
                    .size(10)
                    .style(|theme: &Theme| text::Style {
                        color: Some(theme.extended_palette().background.strong.color),
                    })
            }))
            .push(container(status).style(move |theme: &Theme| container::Style {
                text_color: tint(category, theme).color,
                ..container::Style::default()
            }))
            .spacing(5),
        )
        .padding(5)
        .style(container::bordered_box)
        .into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        keyboard::on_key_press(|key, modifiers| {
            use keyboard::key::Key;

            Some(match key.as_ref() {
                Key::Character("r") if modifiers.is_empty() => Message::Reload,
                _ => None?,
            })
        })
    }
}

fn badge<'a>(category: Category) -> text::Text<'a> {
    match category {
        Category::Wish => icon::heart(),
        Category::Watching => icon::play(),
        Category::Completed => icon::check(),
        Category::OnHold => icon::pause(),
        Category::Dropped => icon::cross(),
    }
    .style(move |theme: &Theme| tint(category, theme))
}

fn tint(category: Category, theme: &Theme) -> text::Style {
    let palette = theme.palette();

    text::Style {
        color: Some(match category {
            Category::Wish => Color::from_rgb8(0xEC, 0x48, 0x99),
            Category::Watching => palette.success,
            Category::Completed => palette.primary,
            Category::OnHold => Color::from_rgb8(0xF5, 0x9E, 0x0B),
            Category::Dropped => theme.extended_palette().background.strong.color,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bangumi::collection::Item;

    use std::time::Duration;

    fn session() -> Session {
        Session::new("https://api.bgm.tv", "animedeck/test", Duration::from_secs(1)).unwrap()
    }

    fn collection(entries: &[(Category, u64)]) -> bangumi::Shelf {
        bangumi::Shelf::from_results(entries.iter().map(|&(category, id)| {
            let item = Item {
                subject: serde_json::from_value(serde_json::json!({"id": id, "name": "X"}))
                    .unwrap(),
                ep_status: None,
            };

            (category, Ok(vec![item]))
        }))
    }

    fn loaded(entries: &[(Category, u64)]) -> Shelf {
        let (mut shelf, _) = Shelf::new("1202652", &session());
        let _ = shelf.update(Message::Loaded(collection(entries)), &session());

        shelf
    }

    fn total(shelf: &Shelf) -> Option<usize> {
        match &shelf.state {
            State::Loading => None,
            State::Loaded(collection) => Some(collection.total()),
        }
    }

    #[test]
    fn toggling_a_section_collapses_and_expands_it() {
        let session = session();
        let mut shelf = loaded(&[(Category::Watching, 1), (Category::Wish, 2)]);

        let _ = shelf.update(Message::Toggle(Category::Watching), &session);
        assert!(shelf.collapsed.contains(&Category::Watching));
        assert!(!shelf.collapsed.contains(&Category::Wish));

        let _ = shelf.update(Message::Toggle(Category::Watching), &session);
        assert!(shelf.collapsed.is_empty());
    }

    #[test]
    fn reload_expands_every_section() {
        let session = session();
        let mut shelf = loaded(&[(Category::Watching, 1), (Category::Dropped, 2)]);

        let _ = shelf.update(Message::Toggle(Category::Watching), &session);
        let _ = shelf.update(Message::Toggle(Category::Dropped), &session);
        let _ = shelf.update(Message::Reload, &session);

        assert!(shelf.collapsed.is_empty());
        assert_eq!(total(&shelf), None);
    }

    #[test]
    fn reload_is_ignored_while_loading() {
        let session = session();
        let (mut shelf, _) = Shelf::new("1202652", &session);

        let _ = shelf.update(Message::Toggle(Category::Wish), &session);
        let _ = shelf.update(Message::Reload, &session);

        assert!(shelf.collapsed.contains(&Category::Wish));
        assert_eq!(total(&shelf), None);
    }

    #[test]
    fn loading_replaces_the_collection() {
        let session = session();
        let mut shelf = loaded(&[(Category::Watching, 1), (Category::Wish, 2)]);
        assert_eq!(total(&shelf), Some(2));

        let _ = shelf.update(Message::Reload, &session);
        let _ = shelf.update(
            Message::Loaded(collection(&[(Category::Completed, 3)])),
            &session,
        );

        let State::Loaded(collection) = &shelf.state else {
            panic!("collection is not loaded");
        };

        let categories: Vec<_> = collection.sections().map(|(category, _)| category).collect();

        assert_eq!(categories, [Category::Completed]);
        assert_eq!(collection.total(), 1);
    }
}
