use bangumi;

mod config;
mod cover;
mod icon;
mod screen;
mod tracked;
mod widget;

use crate::bangumi::Session;
use crate::config::Config;
use crate::screen::Screen;
use crate::screen::{shelf, watchlist};
use crate::widget::logo;

use iced::widget::{button, center, column, container, row, text};
use iced::{Center, Element, Fill, Subscription, Task, Theme};

pub fn main() -> iced::Result {
    tracing_subscriber::fmt::init();

    iced::application(Animedeck::new, Animedeck::update, Animedeck::view)
        .subscription(Animedeck::subscription)
        .theme(Animedeck::theme)
        .window_size((1400.0, 900.0))
        .run()
}

struct Animedeck {
    state: State,
}

enum State {
    Loading,
    Failed(anywho::Error),
    Ready {
        session: Session,
        screen: Screen,
        shelf: screen::Shelf,
        watchlist: screen::Watchlist,
    },
}

#[derive(Debug, Clone)]
enum Message {
    Loaded(Result<Config, anywho::Error>),
    Shelf(shelf::Message),
    Watchlist(watchlist::Message),
    Open(Screen),
}

impl Animedeck {
    fn new() -> (Self, Task<Message>) {
        (
            Self {
                state: State::Loading,
            },
            Task::perform(Config::load(), Message::Loaded),
        )
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Loaded(Ok(config)) => {
                let session = match config.session() {
                    Ok(session) => session,
                    Err(error) => {
                        log::error!("{error}");

                        self.state = State::Failed(error);

                        return Task::none();
                    }
                };

                let (shelf, load_shelf) = screen::Shelf::new(&config.user, &session);
                let (watchlist, load_watchlist) =
                    screen::Watchlist::new(tracked::Storage::default());

                self.state = State::Ready {
                    session,
                    screen: Screen::Shelf,
                    shelf,
                    watchlist,
                };

                Task::batch([
                    load_shelf.map(Message::Shelf),
                    load_watchlist.map(Message::Watchlist),
                ])
            }
            Message::Shelf(message) => {
                let State::Ready { session, shelf, .. } = &mut self.state else {
                    return Task::none();
                };

                shelf.update(message, session).map(Message::Shelf)
            }
            Message::Watchlist(message) => {
                let State::Ready {
                    session, watchlist, ..
                } = &mut self.state
                else {
                    return Task::none();
                };

                watchlist.update(message, session).map(Message::Watchlist)
            }
            Message::Open(new_screen) => {
                if let State::Ready { screen, .. } = &mut self.state {
                    *screen = new_screen;
                }

                Task::none()
            }
            Message::Loaded(Err(error)) => {
                log::error!("{error}");

                self.state = State::Failed(error);

                Task::none()
            }
        }
    }

    fn view(&self) -> Element<Message> {
        match &self.state {
            State::Loading => center(text("Loading...")).into(),
            State::Failed(error) => center(
                column![logo(40), text!("Could not start: {error}").style(text::danger)]
                    .spacing(20)
                    .align_x(Center),
            )
            .into(),
            State::Ready {
                screen,
                shelf,
                watchlist,
                ..
            } => {
                let tabs = [
                    ("Collection", Screen::Shelf),
                    ("Watchlist", Screen::Watchlist),
                ]
                .into_iter()
                .map(|(label, tab)| {
                    let is_active = *screen == tab;

                    button(text(label).size(14))
                        .style(move |theme, status| {
                            if is_active {
                                let palette = theme.extended_palette();

                                button::Style {
                                    background: Some(palette.background.base.color.into()),
                                    text_color: palette.background.base.text,
                                    ..button::text(theme, status)
                                }
                            } else {
                                button::text(theme, status)
                            }
                        })
                        .padding([8, 15])
                        .on_press(Message::Open(tab))
                        .into()
                });

                let navbar = container(
                    row![logo(14), row(tabs)]
                        .spacing(10)
                        .width(Fill)
                        .align_y(Center),
                )
                .padding([0, 10])
                .style(container::dark);

                let screen = match screen {
                    Screen::Shelf => shelf.view().map(Message::Shelf),
                    Screen::Watchlist => watchlist.view().map(Message::Watchlist),
                };

                column![container(screen).height(Fill), navbar].into()
            }
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        let State::Ready { screen, shelf, .. } = &self.state else {
            return Subscription::none();
        };

        match screen {
            Screen::Shelf => shelf.subscription().map(Message::Shelf),
            Screen::Watchlist => Subscription::none(),
        }
    }

    fn theme(&self) -> Theme {
        Theme::CatppuccinMocha
    }
}
