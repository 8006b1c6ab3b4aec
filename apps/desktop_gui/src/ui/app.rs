use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui::TextureHandle;
use profile_client::{EditableField, NoticeLevel, ProfileView, Settings, UploadCaption};
use shared::domain::UserRecord;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{PreviewImage, UiError, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;
use crate::controller::toasts::ToastQueue;

const AVATAR_SIZE: f32 = 96.0;
const DANGER: egui::Color32 = egui::Color32::from_rgb(220, 80, 80);

#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub settings: Settings,
    pub user: UserRecord,
}

#[derive(Debug, Clone)]
struct StatusBanner {
    message: String,
}

enum AvatarPreview {
    Loading(String),
    Ready { url: String, texture: TextureHandle },
    Failed(String),
}

impl AvatarPreview {
    fn url(&self) -> &str {
        match self {
            AvatarPreview::Loading(url) | AvatarPreview::Failed(url) => url,
            AvatarPreview::Ready { url, .. } => url,
        }
    }
}

#[derive(Default)]
struct FieldInputs {
    username: String,
    email: String,
    password: String,
    seeded: bool,
}

pub struct DesktopGuiApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    status: String,
    status_banner: Option<StatusBanner>,
    view: Option<ProfileView>,
    inputs: FieldInputs,
    avatar: Option<AvatarPreview>,
    pending_avatar_image: Option<(String, PreviewImage)>,
    toasts: ToastQueue,
}

impl DesktopGuiApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            status: "Starting...".to_string(),
            status_banner: None,
            view: None,
            inputs: FieldInputs::default(),
            avatar: None,
            pending_avatar_image: None,
            toasts: ToastQueue::default(),
        }
    }

    fn dispatch(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status);
    }

    /// No confirmation step: the request goes out on the first click.
    fn request_delete(&mut self) {
        self.dispatch(BackendCommand::DeleteAccount);
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::ViewUpdated(view) => self.apply_view(view),
                UiEvent::Notice(notice) => {
                    self.toasts.push(notice, Instant::now());
                }
                UiEvent::AvatarLoaded { url, image } => {
                    self.pending_avatar_image = Some((url, image));
                }
                UiEvent::AvatarFailed { url, reason } => {
                    if self.avatar.as_ref().map(AvatarPreview::url) == Some(url.as_str()) {
                        self.status = format!("Could not load avatar: {reason}");
                        self.avatar = Some(AvatarPreview::Failed(url));
                    }
                }
                UiEvent::Error(err) => self.apply_error(err),
            }
        }
    }

    fn apply_view(&mut self, view: ProfileView) {
        if view.signed_in && !self.inputs.seeded {
            self.inputs.username = view.username_default.clone();
            self.inputs.email = view.email_default.clone();
            self.inputs.seeded = true;
        }
        match view.avatar_source.as_deref() {
            Some(url) if self.avatar.as_ref().map(AvatarPreview::url) != Some(url) => {
                self.avatar = Some(AvatarPreview::Loading(url.to_string()));
                self.dispatch(BackendCommand::FetchAvatar {
                    url: url.to_string(),
                });
            }
            Some(_) => {}
            None => self.avatar = None,
        }
        self.view = Some(view);
    }

    fn apply_error(&mut self, err: UiError) {
        tracing::debug!(category = ?err.category(), "ui error: {}", err.message());
        if err.needs_banner() {
            self.status_banner = Some(StatusBanner {
                message: err.message().to_string(),
            });
        }
    }

    fn upload_texture(&mut self, ctx: &egui::Context) {
        let Some((url, image)) = self.pending_avatar_image.take() else {
            return;
        };
        if self.avatar.as_ref().map(AvatarPreview::url) != Some(url.as_str()) {
            return;
        }
        let color_image =
            egui::ColorImage::from_rgba_unmultiplied([image.width, image.height], &image.rgba);
        let texture = ctx.load_texture(
            format!("avatar:{url}"),
            color_image,
            egui::TextureOptions::LINEAR,
        );
        self.avatar = Some(AvatarPreview::Ready { url, texture });
    }

    fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        if let Some(banner) = self.status_banner.clone() {
            egui::Frame::NONE
                .fill(egui::Color32::from_rgb(111, 53, 53))
                .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)))
                .corner_radius(8.0)
                .inner_margin(egui::Margin::symmetric(10, 8))
                .show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        ui.label(egui::RichText::new(&banner.message).color(egui::Color32::WHITE));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Dismiss").clicked() {
                                self.status_banner = None;
                            }
                        });
                    });
                });
        }
    }

    fn show_avatar(&mut self, ui: &mut egui::Ui) {
        let size = egui::vec2(AVATAR_SIZE, AVATAR_SIZE);
        let response = match &self.avatar {
            Some(AvatarPreview::Ready { texture, .. }) => ui.add(
                egui::ImageButton::new(egui::Image::new((texture.id(), size)).corner_radius(48.0))
                    .frame(false),
            ),
            Some(AvatarPreview::Loading(_)) => ui.add_sized(size, egui::Spinner::new()),
            Some(AvatarPreview::Failed(_)) | None => {
                ui.add_sized(size, egui::Button::new("Choose\nphoto"))
            }
        };
        if response.on_hover_text("Change profile picture").clicked() {
            if let Some(path) = rfd::FileDialog::new()
                .add_filter("Images", &["png", "jpg", "jpeg", "gif", "webp", "bmp"])
                .pick_file()
            {
                self.dispatch(BackendCommand::UploadAvatar { path });
            }
        }
    }

    fn show_caption(ui: &mut egui::Ui, caption: UploadCaption) {
        let color = match caption {
            UploadCaption::Error => DANGER,
            UploadCaption::Done => egui::Color32::from_rgb(80, 180, 110),
            UploadCaption::Progress(_) | UploadCaption::Blank => ui.visuals().text_color(),
        };
        ui.label(egui::RichText::new(caption.text()).color(color));
    }

    fn field_input(&mut self, ui: &mut egui::Ui, field: EditableField) {
        let (value, hint, password) = match field {
            EditableField::Username => (&mut self.inputs.username, "username", false),
            EditableField::Email => (&mut self.inputs.email, "email", false),
            EditableField::Password => (&mut self.inputs.password, "password", true),
        };
        let response = ui.add(
            egui::TextEdit::singleline(value)
                .hint_text(hint)
                .password(password)
                .desired_width(f32::INFINITY),
        );
        if response.changed() {
            let value = value.clone();
            self.dispatch(BackendCommand::FieldChanged { field, value });
        }
    }

    fn show_profile(&mut self, ui: &mut egui::Ui, view: &ProfileView) {
        ui.vertical_centered(|ui| {
            ui.heading("Profile");
            ui.add_space(8.0);
            self.show_avatar(ui);
            Self::show_caption(ui, view.caption);
        });
        ui.add_space(8.0);
        for field in EditableField::ALL {
            self.field_input(ui, field);
            ui.add_space(4.0);
        }

        let submit = ui.add_enabled(
            view.submit.enabled,
            egui::Button::new(view.submit.label).min_size(egui::vec2(ui.available_width(), 32.0)),
        );
        if submit.clicked() {
            self.dispatch(BackendCommand::Submit);
        }

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.link(egui::RichText::new("Delete Account").color(DANGER)).clicked() {
                self.request_delete();
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                // Signing out is owned by another part of the app.
                let _ = ui.link(egui::RichText::new("Sign Out").color(DANGER));
            });
        });

        if !view.error_line.is_empty() {
            ui.add_space(6.0);
            ui.colored_label(DANGER, &view.error_line);
        }
    }

    fn show_toasts(&mut self, ctx: &egui::Context) {
        self.toasts.expire(Instant::now());
        let mut dismissed = None;
        egui::Area::new(egui::Id::new("profile-toasts"))
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-12.0, 12.0))
            .show(ctx, |ui| {
                for toast in self.toasts.visible() {
                    let fill = match toast.notice.level {
                        NoticeLevel::Success => egui::Color32::from_rgb(40, 96, 60),
                        NoticeLevel::Error => egui::Color32::from_rgb(111, 53, 53),
                    };
                    egui::Frame::NONE
                        .fill(fill)
                        .corner_radius(8.0)
                        .inner_margin(egui::Margin::symmetric(10, 8))
                        .show(ui, |ui| {
                            ui.horizontal(|ui| {
                                ui.label(
                                    egui::RichText::new(format!(
                                        "{} {}",
                                        toast.prefix(),
                                        toast.notice.text
                                    ))
                                    .color(egui::Color32::WHITE),
                                );
                                if ui.small_button("✕").clicked() {
                                    dismissed = Some(toast.id);
                                }
                            });
                        });
                    ui.add_space(6.0);
                }
            });
        if let Some(id) = dismissed {
            self.toasts.dismiss(id);
        }
    }
}

impl eframe::App for DesktopGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.upload_texture(ctx);

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(egui::RichText::new(&self.status).small().weak());
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_status_banner(ui);
            ui.add_space(12.0);
            ui.vertical_centered(|ui| {
                ui.set_max_width(360.0);
                match self.view.clone() {
                    Some(view) if view.signed_in => self.show_profile(ui, &view),
                    Some(view) => {
                        ui.label("You are signed out.");
                        if !view.error_line.is_empty() {
                            ui.colored_label(DANGER, &view.error_line);
                        }
                    }
                    None => {
                        ui.spinner();
                    }
                }
            });
        });
        self.show_toasts(ctx);

        let uploading = matches!(
            self.view.as_ref().map(|view| view.caption),
            Some(UploadCaption::Progress(_))
        );
        if uploading || !self.toasts.is_empty() {
            ctx.request_repaint_after(std::time::Duration::from_millis(16));
        } else {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use profile_client::Notice;

    fn app() -> (DesktopGuiApp, Receiver<BackendCommand>, Sender<UiEvent>) {
        let (cmd_tx, cmd_rx) = bounded(8);
        let (ui_tx, ui_rx) = bounded(8);
        (DesktopGuiApp::new(cmd_tx, ui_rx), cmd_rx, ui_tx)
    }

    #[test]
    fn delete_click_sends_request_immediately() {
        let (mut app, cmd_rx, _ui_tx) = app();

        app.request_delete();

        assert!(matches!(
            cmd_rx.try_recv(),
            Ok(BackendCommand::DeleteAccount)
        ));
        assert!(cmd_rx.try_recv().is_err());
    }

    #[test]
    fn notices_become_toasts() {
        let (mut app, _cmd_rx, ui_tx) = app();
        ui_tx
            .try_send(UiEvent::Notice(Notice::success("User Information Updated Successfully!")))
            .expect("send");

        app.process_ui_events();

        assert_eq!(app.toasts.visible().len(), 1);
    }
}
