use crate::bangumi::subject::{self, Detail, Subject};
use crate::bangumi::{self, Session};
use crate::cover::{self, Covers};
use crate::icon;
use crate::tracked::{self, Record, Storage};
use crate::widget;

use iced::task;
use iced::widget::{
    button, center, column, container, horizontal_space, row, scrollable, text, text_input,
};
use iced::{Center, Element, Fill, Task, Theme};

use function::Binary;
use std::collections::BTreeSet;

pub struct Watchlist {
    storage: Storage,
    state: State,
    search: String,
    results: Results,
    saving: Saving,
    expanded: BTreeSet<subject::Id>,
    covers: Covers,
}

enum State {
    Loading,
    Ready(tracked::List),
}

/// At most one save runs at a time; changes made meanwhile are saved after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Saving {
    Idle,
    Writing,
    Queued,
}

enum Results {
    Idle,
    Searching {
        _task: task::Handle,
    },
    Found {
        keyword: String,
        candidates: Vec<Record>,
    },
    Failed(bangumi::Error),
}

#[derive(Debug, Clone)]
pub enum Message {
    Loaded(tracked::List),
    SearchChanged(String),
    Search,
    SearchFinished(String, Result<Vec<Subject>, bangumi::Error>),
    Add(subject::Id),
    Hydrated(subject::Id, Result<Detail, bangumi::Error>),
    Toggle(subject::Id),
    Remove(subject::Id),
    Saved(Result<(), anywho::Error>),
    CoverShown(String),
    CoverFetched(cover::Fetched),
}

impl Watchlist {
    pub fn new(storage: Storage) -> (Self, Task<Message>) {
        let load = Task::perform(storage.load(), Message::Loaded);

        (
            Self {
                storage,
                state: State::Loading,
                search: String::new(),
                results: Results::Idle,
                saving: Saving::Idle,
                expanded: BTreeSet::new(),
                covers: Covers::default(),
            },
            load,
        )
    }

    pub fn update(&mut self, message: Message, session: &Session) -> Task<Message> {
        match message {
            Message::Loaded(list) => {
                log::info!(
                    "Loaded {total} tracked anime ({pending} pending hydration)",
                    total = list.len(),
                    pending = list.unhydrated().count()
                );

                let hydrations =
                    Task::batch(list.unhydrated().map(|record| hydrate(record.id, session)));

                self.state = State::Ready(list);

                hydrations
            }
            Message::SearchChanged(search) => {
                self.search = search;

                Task::none()
            }
            Message::Search => {
                let keyword = self.search.trim().to_owned();

                if keyword.is_empty() {
                    return Task::none();
                }

                let search = {
                    let session = session.clone();
                    let keyword = keyword.clone();

                    async move { session.search(&keyword).await }
                };

                let (search, handle) =
                    Task::perform(search, Message::SearchFinished.with(keyword)).abortable();

                // Replacing a pending search aborts it
                self.results = Results::Searching {
                    _task: handle.abort_on_drop(),
                };

                search
            }
            Message::SearchFinished(keyword, Ok(subjects)) => {
                log::info!("Found {} results for \"{keyword}\"", subjects.len());

                self.results = Results::Found {
                    keyword,
                    candidates: subjects.iter().map(Record::candidate).collect(),
                };

                Task::none()
            }
            Message::SearchFinished(keyword, Err(error)) => {
                log::error!("Search for \"{keyword}\" failed: {error}");

                self.results = Results::Failed(error);

                Task::none()
            }
            Message::Add(id) => {
                let State::Ready(list) = &mut self.state else {
                    return Task::none();
                };

                let Results::Found { candidates, .. } = &self.results else {
                    return Task::none();
                };

                let Some(candidate) = candidates.iter().find(|candidate| candidate.id == id)
                else {
                    return Task::none();
                };

                if !list.add(candidate.clone()) {
                    return Task::none();
                }

                self.results = Results::Idle;

                Task::batch([self.save(), hydrate(id, session)])
            }
            Message::Hydrated(id, Ok(detail)) => {
                let State::Ready(list) = &mut self.state else {
                    return Task::none();
                };

                if !list.hydrate(id, &detail) {
                    log::debug!("Discarding details of untracked subject {id}");

                    return Task::none();
                }

                self.save()
            }
            Message::Hydrated(id, Err(error)) => {
                let title = match &self.state {
                    State::Ready(list) => list.get(id).map(|record| record.title.as_str()),
                    State::Loading => None,
                };

                log::warn!(
                    "Could not fetch details of {}: {error}",
                    title.unwrap_or("untracked subject")
                );

                Task::none()
            }
            Message::Toggle(id) => {
                if !self.expanded.remove(&id) {
                    let _ = self.expanded.insert(id);
                }

                Task::none()
            }
            Message::Remove(id) => {
                let State::Ready(list) = &mut self.state else {
                    return Task::none();
                };

                let _ = self.expanded.remove(&id);

                let Some(record) = list.remove(id) else {
                    return Task::none();
                };

                log::info!("Removed {title} from the watchlist", title = record.title);

                self.save()
            }
            Message::Saved(result) => {
                if let Err(error) = result {
                    log::error!("Could not save the watchlist: {error}");
                }

                let queued = self.saving == Saving::Queued;
                self.saving = Saving::Idle;

                if queued {
                    self.save()
                } else {
                    Task::none()
                }
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

    fn save(&mut self) -> Task<Message> {
        let State::Ready(list) = &self.state else {
            return Task::none();
        };

        match self.saving {
            Saving::Idle => {
                self.saving = Saving::Writing;

                Task::perform(self.storage.save(list), Message::Saved)
            }
            Saving::Writing | Saving::Queued => {
                self.saving = Saving::Queued;

                Task::none()
            }
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let State::Ready(list) = &self.state else {
            return center(text("Loading...")).into();
        };

        let search = container(row![
            text_input("Search anime...", &self.search)
                .on_input(Message::SearchChanged)
                .on_submit(Message::Search)
                .padding(10)
                .id("search"),
            button(
                row![icon::search(), text("Search")]
                    .spacing(5)
                    .align_y(Center)
            )
            .on_press(Message::Search)
            .padding(10),
        ]
        .spacing(10))
        .max_width(600);

        let results: Element<_> = match &self.results {
            Results::Idle => horizontal_space().into(),
            Results::Searching { .. } => text("Searching...").size(14).into(),
            Results::Failed(error) => text!("Search failed: {error}")
                .size(14)
                .style(text::danger)
                .into(),
            Results::Found { keyword, candidates } if candidates.is_empty() => {
                text!("No results for \"{keyword}\"").size(14).into()
            }
            Results::Found { candidates, .. } => container(
                scrollable(column(candidates.iter().map(|candidate| {
                    self.result(candidate, list.contains(candidate.id))
                })))
                .spacing(10),
            )
            .max_height(320)
            .padding(5)
            .style(container::bordered_box)
            .into(),
        };

        let tracked: Element<_> = if list.is_empty() {
            center(
                text("Your watchlist is empty. Search for an anime to add it.").style(
                    |theme: &Theme| text::Style {
                        color: Some(theme.extended_palette().background.strong.color),
                    },
                ),
            )
            .into()
        } else {
            scrollable(
                column(list.iter().map(|record| self.record(record)))
                    .spacing(10)
                    .padding([0, 10]),
            )
            .height(Fill)
            .spacing(10)
            .into()
        };

        let header = row![
            text("Watchlist").size(20),
            text!("{} tracked", list.len()).size(12),
        ]
        .spacing(10)
        .align_y(Center);

        column![header, search, results, tracked]
            .spacing(10)
            .padding(10)
            .into()
    }

    fn result<'a>(&'a self, candidate: &'a Record, is_tracked: bool) -> Element<'a, Message> {
        row![
            self.thumbnail(&candidate.cover, 40.0),
            widget::title(&candidate.title).size(14),
            horizontal_space(),
            button(
                row![icon::add().size(12), text("Add").size(12)]
                    .spacing(5)
                    .align_y(Center)
            )
            .on_press_maybe((!is_tracked).then_some(Message::Add(candidate.id)))
            .padding([5, 10]),
        ]
        .spacing(10)
        .padding(5)
        .align_y(Center)
        .into()
    }

    fn record<'a>(&'a self, record: &'a Record) -> Element<'a, Message> {
        let summary = row![
            self.thumbnail(&record.cover, 60.0),
            column![
                widget::title(&record.title).size(16),
                text!("Episodes: {}", record.eps).size(12),
            ]
            .spacing(5),
        ]
        .spacing(10)
        .align_y(Center);

        let detail = self.expanded.contains(&record.id).then(|| {
            let content = if !record.summary.is_empty() {
                widget::title(&record.summary)
            } else if record.hydrated {
                text("No summary")
            } else {
                text("Loading...")
            };

            column![
                content.size(13),
                button(text("Remove").size(12))
                    .on_press(Message::Remove(record.id))
                    .style(button::danger)
                    .padding([5, 10]),
            ]
            .spacing(10)
        });

        // Pressing the inner remove button never reaches the row
        button(
            container(column![summary].push_maybe(detail).spacing(10))
                .padding(10)
                .width(Fill)
                .style(container::bordered_box),
        )
        .on_press(Message::Toggle(record.id))
        .padding(0)
        .style(button::text)
        .into()
    }

    fn thumbnail<'a>(&'a self, url: &'a str, width: f32) -> Element<'a, Message> {
        container(self.covers.view(url, Message::CoverShown(url.to_owned())))
            .width(width)
            .height(width * 1.4)
            .into()
    }
}

fn hydrate(id: subject::Id, session: &Session) -> Task<Message> {
    let session = session.clone();

    Task::perform(
        async move { session.subject(id).await },
        Message::Hydrated.with(id),
    )
}
