//! Review client UI and state management.
//! Handles user selection, theme enrollment, daily review sessions and the
//! simulated calendar that drives the catch-up sweep.

use chrono::NaiveDate;
use eframe::egui;
use review_scheduler::config::Settings;
use review_scheduler::database::db::{self, SqliteStore, UserProfile};
use review_scheduler::export::json::{export_records_to_path, import_theme};
use review_scheduler::{
    LevelCap, ReviewHorizon, ReviewSession, Scheduler, ThemeProgress, ThemeSnapshot, UserId,
};
use tracing::{error, info};

/// Application screen states
#[derive(Default)]
enum AppScreen {
    #[default]
    Main,
    Review,
}

/// Main application state
pub struct ReviewApp {
    show_confirmation_dialog: bool,
    allowed_to_close: bool,
    settings: Settings,
    store: SqliteStore,
    scheduler: Scheduler<SqliteStore, SqliteStore>,

    users: Vec<UserProfile>,
    selected_user_index: Option<usize>,
    new_user_name: String,
    new_user_cap: i64,

    themes: Vec<ThemeSnapshot>,
    today: NaiveDate,
    horizon: Option<ReviewHorizon>,
    reviewed_themes: Vec<ThemeProgress>,

    current_screen: AppScreen,
    review_session: Option<ReviewSession>,

    show_result_dialog: bool,
    result_message: String,
}

impl eframe::App for ReviewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match self.current_screen {
            AppScreen::Main => self.render_main_screen(ctx),
            AppScreen::Review => self.render_review_screen(ctx),
        }

        // Handle window close requests with confirmation dialog
        if ctx.input(|i| i.viewport().close_requested()) && !self.allowed_to_close {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.show_confirmation_dialog = true;
        }

        if self.show_confirmation_dialog {
            egui::Window::new("Do you want to quit?")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        if ui.button("No").clicked() {
                            self.show_confirmation_dialog = false;
                            self.allowed_to_close = false;
                        }

                        if ui.button("Yes").clicked() {
                            self.show_confirmation_dialog = false;
                            self.allowed_to_close = true;
                            ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    });
                });
        }

        if self.show_result_dialog {
            egui::Window::new("Result")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(&self.result_message);
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        self.show_result_dialog = false;
                    }
                });
        }
    }
}

impl ReviewApp {
    /// Creates the application over an opened store
    pub fn new(settings: Settings, store: SqliteStore) -> review_scheduler::Result<Self> {
        let scheduler = Scheduler::new(store.clone(), store.clone());
        let (users, themes, today) = {
            let conn = store.lock()?;
            (
                db::get_all_users(&conn)?,
                db::load_all_themes(&conn)?,
                db::get_current_date(&conn)?,
            )
        };
        let new_user_cap = settings.default_level_cap;

        let mut app = Self {
            show_confirmation_dialog: false,
            allowed_to_close: false,
            settings,
            store,
            scheduler,
            selected_user_index: if users.is_empty() { None } else { Some(0) },
            users,
            new_user_name: String::new(),
            new_user_cap,
            themes,
            today,
            horizon: None,
            reviewed_themes: Vec::new(),
            current_screen: AppScreen::Main,
            review_session: None,
            show_result_dialog: false,
            result_message: String::new(),
        };
        app.refresh_overview();
        Ok(app)
    }

    fn selected_user(&self) -> Option<UserId> {
        self.selected_user_index
            .and_then(|i| self.users.get(i))
            .map(|user| user.id)
    }

    fn show_result(&mut self, message: String) {
        self.result_message = message;
        self.show_result_dialog = true;
    }

    /// Reloads the selected user's horizon and reviewed themes
    fn refresh_overview(&mut self) {
        self.horizon = None;
        self.reviewed_themes.clear();
        let Some(user_id) = self.selected_user() else {
            return;
        };

        let overview = self
            .scheduler
            .next_review_horizon(user_id, self.today)
            .and_then(|horizon| {
                let reviewed = self.scheduler.reviewed_themes(user_id, &self.themes)?;
                Ok((horizon, reviewed))
            });
        match overview {
            Ok((horizon, reviewed)) => {
                self.horizon = Some(horizon);
                self.reviewed_themes = reviewed;
            }
            Err(e) => {
                error!(user_id, error = %e, "failed to load review overview");
                self.show_result(format!("Failed to load reviews: {}", e));
            }
        }
    }

    /// Renders the main screen with users, themes and the calendar
    fn render_main_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(self.today.format("%Y-%m-%d").to_string());

                if ui.button("Next Day").clicked() {
                    self.handle_next_day();
                }
            });
            ui.separator();

            ui.heading("Create New User");
            ui.horizontal(|ui| {
                ui.label("Name:");
                ui.text_edit_singleline(&mut self.new_user_name);
            });
            ui.horizontal(|ui| {
                ui.label("Level cap:");
                ui.add(egui::Slider::new(&mut self.new_user_cap, 1..=7));
                if ui.button("Create User").clicked() && !self.new_user_name.is_empty() {
                    self.handle_create_user();
                }
                if ui.button("Set Cap for Selected").clicked() {
                    self.handle_set_level_cap();
                }
            });

            ui.separator();

            ui.heading(format!("Users ({})", self.users.len()));

            // We store actions to execute after UI rendering to avoid borrowing conflicts
            let mut action_select: Option<usize> = None;

            egui::ScrollArea::vertical()
                .id_salt("users_list")
                .max_height(120.0)
                .show(ui, |ui| {
                    for (i, user) in self.users.iter().enumerate() {
                        let is_selected = self.selected_user_index == Some(i);
                        if ui
                            .selectable_label(
                                is_selected,
                                format!("{}. {} (level cap {})", i + 1, user.name, user.level_cap),
                            )
                            .clicked()
                        {
                            action_select = Some(i);
                        }
                    }
                });

            if let Some(i) = action_select {
                self.selected_user_index = Some(i);
                self.refresh_overview();
            }

            ui.separator();

            let Some(user_id) = self.selected_user() else {
                ui.label("Select a user to start reviewing");
                return;
            };

            match self.horizon {
                Some(ReviewHorizon { due_today, .. }) if due_today > 0 => {
                    ui.label(format!("{} cards due today", due_today));
                }
                Some(ReviewHorizon {
                    next_due_in_days: Some(days),
                    ..
                }) => {
                    ui.label(format!("All done! Next review in {} days", days));
                }
                _ => {
                    ui.label("Nothing scheduled. Enroll a theme to start.");
                }
            }

            ui.horizontal(|ui| {
                if ui.button("Start Review").clicked() {
                    self.start_review_session(user_id);
                }
                if ui.button("Import Theme").clicked() {
                    self.handle_import(user_id);
                }
                if ui.button("Export Reviews").clicked() {
                    self.handle_export(user_id);
                }
                if ui.button("Reset Reviews").clicked() {
                    self.handle_reset(user_id);
                }
            });

            ui.separator();

            ui.heading(format!("Themes ({})", self.themes.len()));
            ui.label(format!("Reviewing {} of them", self.reviewed_themes.len()));

            let mut action_enroll: Option<usize> = None;
            let mut action_stop: Option<usize> = None;
            let mut action_delete: Option<usize> = None;

            egui::ScrollArea::vertical()
                .id_salt("themes_list")
                .max_height(250.0)
                .show(ui, |ui| {
                    for (i, theme) in self.themes.iter().enumerate() {
                        ui.group(|ui| {
                            let progress =
                                self.reviewed_themes.iter().find(|p| p.theme_id == theme.id);
                            let status = match progress {
                                Some(p) if p.is_complete() => "in review".to_string(),
                                Some(p) => {
                                    format!("{}/{} in review", p.reviewed_cards, p.total_cards)
                                }
                                None => "not reviewed".to_string(),
                            };
                            ui.label(format!(
                                "{} ({} cards, {})",
                                theme.name,
                                theme.cards.len(),
                                status
                            ));
                            ui.horizontal(|ui| {
                                if ui.button("Enroll").clicked() {
                                    action_enroll = Some(i);
                                }
                                if ui.button("Stop Reviewing").clicked() {
                                    action_stop = Some(i);
                                }
                                if ui.button("Delete Theme").clicked() {
                                    action_delete = Some(i);
                                }
                            });
                        });
                    }
                });

            // Execute deferred actions
            if let Some(i) = action_enroll {
                self.handle_enroll(user_id, i);
            }
            if let Some(i) = action_stop {
                self.handle_stop_reviewing(user_id, i);
            }
            if let Some(i) = action_delete {
                self.handle_delete_theme(i);
            }
        });
    }

    /// Renders the review screen with the current card
    fn render_review_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(session) = &mut self.review_session else {
                self.current_screen = AppScreen::Main;
                return;
            };

            ui.heading(format!("Review for {}", session.today.format("%Y-%m-%d")));
            ui.label(format!(
                "Progress: {} / {} answered ({} correct)",
                session.answered_count(),
                session.total_count(),
                session.correct_count()
            ));

            ui.add_space(20.0);

            let mut action_back = false;
            let mut action_answer: Option<bool> = None;

            if session.is_completed() {
                ui.heading("Session complete!");
                ui.label(format!(
                    "{} of {} cards answered correctly.",
                    session.correct_count(),
                    session.total_count()
                ));
                ui.add_space(20.0);
                if ui.button("Back to Main Screen").clicked() {
                    action_back = true;
                }
            } else if let Some(current) = session.current_card() {
                let show_back = session.show_back;
                let (front, back) = match &current.card {
                    Some(card) => (card.front.clone(), card.back.clone()),
                    None => (
                        format!("Card #{}", current.record.card_id),
                        "(card text not in any loaded theme)".to_string(),
                    ),
                };
                let level = current.record.level;

                ui.group(|ui| {
                    ui.set_min_height(200.0);
                    ui.vertical_centered(|ui| {
                        ui.add_space(20.0);
                        ui.label(format!("Level {}", level));
                        ui.heading(&front);
                        ui.add_space(20.0);
                        if show_back {
                            ui.heading(&back);
                        } else {
                            ui.label("(Click 'Show Answer' to reveal)");
                        }
                        ui.add_space(20.0);
                    });
                });

                ui.add_space(20.0);

                let mut action_toggle = false;
                if !show_back {
                    if ui.button("Show Answer").clicked() {
                        action_toggle = true;
                    }
                } else {
                    ui.horizontal(|ui| {
                        if ui.button("Wrong").clicked() {
                            action_answer = Some(false);
                        }
                        if ui.button("Correct").clicked() {
                            action_answer = Some(true);
                        }
                    });
                }

                ui.add_space(20.0);
                if ui.button("Back to Main Screen").clicked() {
                    action_back = true;
                }

                if action_toggle {
                    session.toggle_back();
                }
            }

            if let Some(correct) = action_answer {
                if let Err(e) = session.answer_current(correct, &self.scheduler) {
                    error!(error = %e, "failed to record answer");
                    self.result_message = format!("Failed to record answer: {}", e);
                    self.show_result_dialog = true;
                }
            }
            if action_back {
                self.current_screen = AppScreen::Main;
                self.review_session = None;
                self.refresh_overview();
            }
        });
    }

    /// Advances the simulated calendar and runs the catch-up sweep for the new day
    fn handle_next_day(&mut self) {
        let advanced = self
            .store
            .lock()
            .and_then(|conn| Ok(db::advance_day(&conn)?));

        match advanced {
            Ok(today) => {
                self.today = today;
                match self.scheduler.catch_up_sweep(today) {
                    Ok(report) if !report.is_clean() => self.show_result(format!(
                        "Rescheduled {} missed cards, {} failed.",
                        report.rescheduled,
                        report.failure_count()
                    )),
                    Ok(_) => {}
                    Err(e) => self.show_result(format!("Catch-up sweep failed: {}", e)),
                }
                self.refresh_overview();
            }
            Err(e) => self.show_result(format!("Failed to advance the day: {}", e)),
        }
    }

    fn handle_create_user(&mut self) {
        let created = LevelCap::new(self.new_user_cap).and_then(|cap| {
            let conn = self.store.lock()?;
            let id = db::new_user(&self.new_user_name, cap, &conn)?;
            Ok((id, db::get_all_users(&conn)?))
        });

        match created {
            Ok((id, users)) => {
                info!(user_id = id, name = %self.new_user_name, "user created");
                self.selected_user_index = users.iter().position(|u| u.id == id);
                self.users = users;
                self.new_user_name.clear();
                self.refresh_overview();
            }
            Err(e) => self.show_result(format!("Failed to create user: {}", e)),
        }
    }

    fn handle_set_level_cap(&mut self) {
        let Some(user_id) = self.selected_user() else {
            return;
        };

        let updated = LevelCap::new(self.new_user_cap).and_then(|cap| {
            let conn = self.store.lock()?;
            db::set_level_cap(user_id, cap, &conn)?;
            Ok(db::get_all_users(&conn)?)
        });

        match updated {
            Ok(users) => self.users = users,
            Err(e) => self.show_result(format!("Failed to update level cap: {}", e)),
        }
    }

    /// Starts a review session with a random pick of today's due cards
    fn start_review_session(&mut self, user_id: UserId) {
        let due_today = self.horizon.map(|h| h.due_today).unwrap_or(0);
        if due_today == 0 {
            self.show_result("No cards are due today.".to_string());
            return;
        }

        let count = due_today.min(self.settings.session_size.max(1));
        match self.scheduler.select_due_cards(user_id, count, self.today) {
            Ok(records) => {
                self.review_session = Some(ReviewSession::new(
                    user_id,
                    self.today,
                    records,
                    &self.themes,
                ));
                self.current_screen = AppScreen::Review;
            }
            Err(e) => self.show_result(format!("Could not start review: {}", e)),
        }
    }

    /// Handles theme import from a JSON file and enrolls the selected user
    fn handle_import(&mut self, user_id: UserId) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON files", &["json"])
            .pick_file()
        else {
            return;
        };

        let theme = match import_theme(&path) {
            Ok(theme) => theme,
            Err(e) => {
                self.show_result(format!(
                    "Import failed: {}\n\nPlease check if the file has correct structure:\n{{\n  \"id\": 1,\n  \"name\": \"Theme Name\",\n  \"cards\": [...]\n}}",
                    e
                ));
                return;
            }
        };

        let saved = self.store.lock().and_then(|mut conn| {
            let dropped = db::save_theme(&theme, &mut conn)?;
            Ok((dropped, db::load_all_themes(&conn)?))
        });
        let (dropped, themes) = match saved {
            Ok(saved) => saved,
            Err(e) => {
                self.show_result(format!("Failed to save theme: {}", e));
                return;
            }
        };
        self.themes = themes;

        if !dropped.is_empty() {
            match self.scheduler.remove_records_for_cards(&dropped) {
                Ok(removed) => info!(
                    theme_id = theme.id,
                    cards = dropped.len(),
                    removed,
                    "dropped cards removed from review"
                ),
                Err(e) => {
                    self.show_result(format!("Failed to remove dropped cards: {}", e));
                    self.refresh_overview();
                    return;
                }
            }
        }

        if let Some(index) = self.themes.iter().position(|t| t.id == theme.id) {
            self.handle_enroll(user_id, index);
        }
    }

    fn handle_enroll(&mut self, user_id: UserId, theme_index: usize) {
        let Some(theme) = self.themes.get(theme_index) else {
            return;
        };

        let message = match self.scheduler.enroll_theme(user_id, theme, self.today) {
            Ok(summary) => format!(
                "Theme '{}': {} cards enrolled, {} already in review.",
                theme.name, summary.enrolled, summary.skipped
            ),
            Err(e) => format!("Failed to enroll theme '{}': {}", theme.name, e),
        };
        self.show_result(message);
        self.refresh_overview();
    }

    fn handle_stop_reviewing(&mut self, user_id: UserId, theme_index: usize) {
        let Some(theme) = self.themes.get(theme_index) else {
            return;
        };

        let message = match self
            .scheduler
            .remove_theme_for_user(user_id, &theme.card_ids())
        {
            Ok(removed) => format!("Removed {} cards of '{}' from review.", removed, theme.name),
            Err(e) => format!("Failed to remove theme: {}", e),
        };
        self.show_result(message);
        self.refresh_overview();
    }

    /// Deletes a theme from the catalog, then drops every user's records for its cards
    fn handle_delete_theme(&mut self, theme_index: usize) {
        let Some(theme_id) = self.themes.get(theme_index).map(|t| t.id) else {
            return;
        };

        let deleted = self
            .store
            .lock()
            .and_then(|mut conn| Ok(db::delete_theme(theme_id, &mut conn)?))
            .and_then(|card_ids| self.scheduler.remove_records_for_cards(&card_ids));

        match deleted {
            Ok(removed) => {
                self.themes.remove(theme_index);
                self.show_result(format!("Theme deleted, {} review records removed.", removed));
            }
            Err(e) => self.show_result(format!("Failed to delete theme: {}", e)),
        }
        self.refresh_overview();
    }

    fn handle_reset(&mut self, user_id: UserId) {
        let message = match self.scheduler.remove_all_for_user(user_id) {
            Ok(removed) => format!("{} review records removed.", removed),
            Err(e) => format!("Failed to reset reviews: {}", e),
        };
        self.show_result(message);
        self.refresh_overview();
    }

    /// Handles export of the selected user's review records to a JSON file
    fn handle_export(&mut self, user_id: UserId) {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(format!("reviews-{}.json", user_id))
            .add_filter("JSON files", &["json"])
            .save_file()
        else {
            return;
        };

        let message = match self.scheduler.records_for_user(user_id) {
            Ok(records) => match export_records_to_path(user_id, &records, self.today, &path) {
                Ok(()) => format!("Exported {} review records.", records.len()),
                Err(e) => format!("Export failed: {}", e),
            },
            Err(e) => format!("Export failed: {}", e),
        };
        self.show_result(message);
    }
}
