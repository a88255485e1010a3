use chrono::Utc;
use ecobotcore::detection::{
    content_type_for_path, export_file_name, probe_dimensions, DetectionResult, ImageUpload,
    DEFAULT_MAX_UPLOAD_BYTES,
};
use ecobotcore::overlay::{self as overlay, DisplayRect, DrawSurface, LoadSignal, LoadTicket};
use ecobotcore::ResultsView;
use iced::{
    mouse, time,
    widget::{
        button,
        canvas::{self, Canvas, Frame, Geometry, Stroke},
        column, image, row, scrollable, stack, text, text_input, Column, Container, Row,
    },
    Alignment, Color, ContentFit, Element, Font, Length, Pixels, Point, Rectangle, Renderer,
    Size, Subscription, Task, Theme,
};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

const BRIDGE_URL: &str = "http://127.0.0.1:9000";
const IMAGE_HEIGHT: f32 = 500.0;
const PREVIEW_HEIGHT: f32 = 180.0;
const LABEL_FONT_PX: f32 = 12.0;
/// Horizontal advance of the monospace label face, as a fraction of its size.
const MONO_ADVANCE_EM: f32 = 0.6;

fn main() -> iced::Result {
    iced::application(Visualizer::boot, Visualizer::update, Visualizer::view)
        .title(application_title)
        .subscription(application_subscription)
        .theme(application_theme)
        .run()
}

fn application_title(_: &Visualizer) -> String {
    "EcoBot Detection Viewer".into()
}

fn application_subscription(_: &Visualizer) -> Subscription<Message> {
    time::every(Duration::from_secs(1)).map(|_| Message::Tick)
}

fn application_theme(_: &Visualizer) -> Theme {
    Theme::Dark
}

/// A validated local image waiting for "Detect Plastic".
struct UploadPreview {
    upload: ImageUpload,
    handle: image::Handle,
}

struct Visualizer {
    upload_path: String,
    preview: Option<UploadPreview>,
    view: ResultsView,
    image: Option<image::Handle>,
    /// Set by the one-shot load signal of the image currently shown.
    overlay: Option<LoadTicket>,
    revision: u64,
    uploading: bool,
    status: String,
    history: Vec<String>,
}

#[derive(Debug, Clone)]
enum Message {
    Tick,
    PayloadFetched(Result<VisualizationPayload, String>),
    ImageFetched(LoadTicket, Result<Vec<u8>, String>),
    OverlayReady(LoadTicket, Option<overlay::Size>),
    UploadPathChanged(String),
    PreviewUpload,
    PreviewLoaded(Result<ImageUpload, String>),
    RemovePreview,
    SubmitUpload,
    UploadFinished(Result<String, String>),
    ToggleFilter(String),
    ClearFilter,
    Export,
    Reset,
    ResetFinished(Result<(), String>),
}

impl Visualizer {
    fn boot() -> (Self, Task<Message>) {
        (
            Visualizer {
                upload_path: String::new(),
                preview: None,
                view: ResultsView::default(),
                image: None,
                overlay: None,
                revision: 0,
                uploading: false,
                status: "Choose an image to analyze.".into(),
                history: Vec::new(),
            },
            Task::perform(fetch_payload(), Message::PayloadFetched),
        )
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => Task::perform(fetch_payload(), Message::PayloadFetched),
            Message::PayloadFetched(Ok(payload)) => {
                if payload.revision == state.revision {
                    return Task::none();
                }
                state.revision = payload.revision;
                state.image = None;
                state.overlay = None;
                if payload.detections.is_empty() || payload.image_name.is_none() {
                    state.view.reset();
                    return Task::none();
                }

                let name = payload.image_name.unwrap_or_default();
                state.push_history(format!(
                    "{}: {} detections",
                    name,
                    payload.detections.len()
                ));
                let ticket = state
                    .view
                    .show(payload.detections, format!("{name}#{}", payload.revision));
                let ready = state.view.loaded();
                let image_ticket = ticket.clone();
                Task::batch([
                    Task::perform(fetch_image(payload.revision), move |bytes| {
                        Message::ImageFetched(image_ticket, bytes)
                    }),
                    Task::perform(async move { ready.await.ok() }, move |natural| {
                        Message::OverlayReady(ticket, natural)
                    }),
                ])
            }
            Message::PayloadFetched(Err(err)) => {
                state.status = format!("Bridge unavailable: {err}");
                Task::none()
            }
            Message::ImageFetched(ticket, Ok(bytes)) => {
                match probe_dimensions(&bytes) {
                    Ok(natural) => {
                        if let LoadSignal::Loaded { natural, .. } =
                            state.view.image_loaded(&ticket, natural.into())
                        {
                            state.image = Some(image::Handle::from_bytes(bytes));
                            state.status = format!(
                                "Showing {} detections on a {}x{} image",
                                state.view.results().len(),
                                natural.width,
                                natural.height
                            );
                        }
                    }
                    Err(err) => state.status = format!("Image error: {err}"),
                }
                Task::none()
            }
            Message::ImageFetched(_, Err(err)) => {
                state.status = format!("Image error: {err}");
                Task::none()
            }
            Message::OverlayReady(ticket, Some(_)) => {
                if state.view.is_current(&ticket) {
                    state.overlay = Some(ticket);
                }
                Task::none()
            }
            // The image was replaced before it loaded.
            Message::OverlayReady(_, None) => Task::none(),
            Message::UploadPathChanged(value) => {
                state.upload_path = value;
                Task::none()
            }
            Message::PreviewUpload => {
                if state.upload_path.trim().is_empty() {
                    return Task::none();
                }
                let path = PathBuf::from(state.upload_path.trim());
                Task::perform(load_upload(path), Message::PreviewLoaded)
            }
            Message::PreviewLoaded(Ok(upload)) => {
                state.status = format!("Ready to analyze {}", upload.name);
                state.preview = Some(UploadPreview {
                    handle: image::Handle::from_bytes(upload.bytes.clone()),
                    upload,
                });
                Task::none()
            }
            Message::PreviewLoaded(Err(err)) => {
                state.preview = None;
                state.status = err;
                Task::none()
            }
            Message::RemovePreview => {
                state.preview = None;
                state.upload_path.clear();
                state.status = "Choose an image to analyze.".into();
                Task::none()
            }
            Message::SubmitUpload => {
                let Some(preview) = state.preview.as_ref() else {
                    return Task::none();
                };
                if state.uploading {
                    return Task::none();
                }
                state.uploading = true;
                state.status = "Analyzing image...".into();
                Task::perform(post_image(preview.upload.clone()), Message::UploadFinished)
            }
            Message::UploadFinished(Ok(message)) => {
                state.uploading = false;
                state.push_history(message.clone());
                state.status = message;
                Task::perform(fetch_payload(), Message::PayloadFetched)
            }
            Message::UploadFinished(Err(err)) => {
                state.uploading = false;
                state.status = err;
                Task::none()
            }
            Message::ToggleFilter(class) => {
                state.view.toggle_filter(&class);
                Task::none()
            }
            Message::ClearFilter => {
                state.view.clear_filter();
                Task::none()
            }
            Message::Export => {
                let now = Utc::now();
                let path = PathBuf::from(export_file_name(now));
                state.status = match state.view.export(now).to_json_pretty() {
                    Ok(json) => match std::fs::write(&path, json) {
                        Ok(()) => format!("Results saved to {}", path.display()),
                        Err(err) => format!("Export failed: {err}"),
                    },
                    Err(err) => format!("Export failed: {err}"),
                };
                Task::none()
            }
            Message::Reset => Task::perform(post_reset(), Message::ResetFinished),
            Message::ResetFinished(result) => {
                state.view.reset();
                state.image = None;
                state.overlay = None;
                state.preview = None;
                state.upload_path.clear();
                state.status = match result {
                    Ok(()) => "Ready for a new detection.".into(),
                    Err(err) => format!("Reset error: {err}"),
                };
                Task::none()
            }
        }
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let detect_button = match (state.uploading, state.preview.is_some()) {
            (true, _) => button("Analyzing...").padding(10),
            (false, true) => button("Detect Plastic")
                .on_press(Message::SubmitUpload)
                .padding(10),
            (false, false) => button("Detect Plastic").padding(10),
        };

        let upload_column = column![
            text("Upload Image").size(26),
            row![
                text_input("Path to a JPEG or PNG (max 10MB)", &state.upload_path)
                    .on_input(Message::UploadPathChanged)
                    .on_submit(Message::PreviewUpload)
                    .padding(6),
                button("Open").on_press(Message::PreviewUpload).padding(6),
            ]
            .spacing(6),
            state.preview_panel(),
            detect_button,
            text(&state.status).size(14),
            state.summary_panel(),
            state.filter_panel(),
            column![
                text("Tips").size(16),
                text("Filter by type to focus on specific plastics.").size(12),
                text("Export results for further analysis.").size(12),
                text("Try different images for better accuracy.").size(12),
            ]
            .spacing(4)
            .padding(6),
        ]
        .spacing(10)
        .padding(16)
        .width(Length::Fixed(360.0));

        let picture: Element<'_, Message> = match state.image.as_ref() {
            Some(handle) => image(handle.clone())
                .content_fit(ContentFit::ScaleDown)
                .width(Length::Fill)
                .height(Length::Fixed(IMAGE_HEIGHT))
                .into(),
            None => Container::new(text("No image analyzed yet").size(14))
                .center(Length::Fill)
                .height(Length::Fixed(IMAGE_HEIGHT))
                .into(),
        };

        let overlay_canvas = Canvas::new(OverlayCanvas {
            view: &state.view,
            armed: state
                .overlay
                .as_ref()
                .is_some_and(|ticket| state.view.is_current(ticket)),
        })
        .width(Length::Fill)
        .height(Length::Fixed(IMAGE_HEIGHT));

        let history_list = if state.history.is_empty() {
            Column::new().push(text("No activity yet").size(12))
        } else {
            state
                .history
                .iter()
                .rev()
                .fold(Column::new().spacing(4), |col, entry| {
                    col.push(text(entry.clone()).size(12))
                })
        };

        let results_column = column![
            row![
                text("Detection Results").size(26).width(Length::Fill),
                button("Export").on_press(Message::Export).padding(8),
                button("New Detection").on_press(Message::Reset).padding(8),
            ]
            .spacing(10)
            .align_y(Alignment::Center),
            stack![picture, overlay_canvas],
            text("Activity log").size(16),
            Container::new(scrollable(history_list).height(Length::Fixed(90.0))).padding(6),
        ]
        .spacing(10)
        .padding(16)
        .width(Length::Fill);

        let layout = row![upload_column, results_column]
            .spacing(20)
            .align_y(Alignment::Start)
            .padding(20);

        Container::new(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }

    fn preview_panel(&self) -> Column<'_, Message> {
        let Some(preview) = self.preview.as_ref() else {
            return Column::new().push(text("No image selected").size(12));
        };
        column![
            image(preview.handle.clone())
                .content_fit(ContentFit::Contain)
                .width(Length::Fill)
                .height(Length::Fixed(PREVIEW_HEIGHT)),
            row![
                text(format!(
                    "{} ({:.1} KB)",
                    preview.upload.name,
                    preview.upload.size() as f64 / 1024.0
                ))
                .size(12)
                .width(Length::Fill),
                button(text("Remove").size(12))
                    .on_press(Message::RemovePreview)
                    .padding(6),
            ]
            .spacing(6)
            .align_y(Alignment::Center),
        ]
        .spacing(6)
    }

    fn summary_panel(&self) -> Column<'_, Message> {
        let palette = self.view.palette();
        let header = column![
            text("Summary").size(18),
            text(format!("Total detections: {}", self.view.results().len())).size(14),
        ]
        .spacing(4);

        self.view
            .type_counts()
            .into_iter()
            .fold(header, |col, (class, count)| {
                let swatch = to_iced_color(palette.color_for(class));
                col.push(
                    text(format!("● {}: {}", class.replace('_', " "), count))
                        .size(14)
                        .color(swatch),
                )
            })
            .padding(6)
    }

    fn filter_panel(&self) -> Column<'_, Message> {
        let active = self.view.active_filter();
        let mut buttons = self
            .view
            .categories()
            .into_iter()
            .fold(Row::new().spacing(6), |row, class| {
                let label = if active == Some(class) {
                    format!("[{}]", class.replace('_', " "))
                } else {
                    class.replace('_', " ")
                };
                row.push(
                    button(text(label).size(12))
                        .on_press(Message::ToggleFilter(class.to_string()))
                        .padding(6),
                )
            });
        if active.is_some() {
            buttons = buttons.push(
                button(text("Clear filter").size(12))
                    .on_press(Message::ClearFilter)
                    .padding(6),
            );
        }

        column![text("Filter by Type").size(18), buttons.wrap()]
            .spacing(6)
            .padding(6)
    }

    fn push_history(&mut self, entry: String) {
        self.history.push(entry);
        if self.history.len() > 20 {
            self.history.remove(0);
        }
    }
}

/// Checks a picked file the same way the detector will before it is sent.
fn prepare_upload(
    name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
) -> Result<ImageUpload, String> {
    let upload = ImageUpload::new(name, content_type, bytes);
    upload
        .validate(DEFAULT_MAX_UPLOAD_BYTES)
        .map_err(|err| err.to_string())?;
    Ok(upload)
}

async fn load_upload(path: PathBuf) -> Result<ImageUpload, String> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| format!("{}: {e}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".into());
    prepare_upload(name, content_type_for_path(&path), bytes)
}

async fn fetch_payload() -> Result<VisualizationPayload, String> {
    let response = reqwest::get(format!("{BRIDGE_URL}/payload"))
        .await
        .map_err(|e| e.to_string())?;
    response
        .json::<VisualizationPayload>()
        .await
        .map_err(|e| e.to_string())
}

async fn fetch_image(revision: u64) -> Result<Vec<u8>, String> {
    let response = reqwest::Client::new()
        .get(format!("{BRIDGE_URL}/image"))
        .query(&[("revision", revision)])
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if response.status() == reqwest::StatusCode::CONFLICT {
        return Err(format!("revision {revision} was superseded"));
    }
    if !response.status().is_success() {
        return Err(format!("image request failed: {}", response.status()));
    }
    response
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|e| e.to_string())
}

async fn post_image(upload: ImageUpload) -> Result<String, String> {
    let mut request = reqwest::Client::new()
        .post(format!("{BRIDGE_URL}/detect"))
        .query(&[("name", upload.name.as_str())])
        .body(upload.bytes.clone());
    if let Some(content_type) = upload.content_type.as_deref() {
        request = request.header(reqwest::header::CONTENT_TYPE, content_type);
    }

    let response = request.send().await.map_err(|e| e.to_string())?;
    let status = response.status();
    let body = response
        .json::<DetectReply>()
        .await
        .map_err(|e| e.to_string())?;
    if status.is_success() {
        Ok(body
            .description
            .unwrap_or_else(|| "Detection complete!".into()))
    } else {
        Err(body
            .message
            .unwrap_or_else(|| format!("Detection failed ({status})")))
    }
}

async fn post_reset() -> Result<(), String> {
    let response = reqwest::Client::new()
        .post(format!("{BRIDGE_URL}/reset"))
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if response.status().is_success() {
        Ok(())
    } else {
        Err(response.status().to_string())
    }
}

#[derive(Debug, Deserialize)]
struct DetectReply {
    description: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct VisualizationPayload {
    #[serde(default)]
    revision: u64,
    #[serde(default)]
    image_name: Option<String>,
    #[serde(default)]
    detections: Vec<DetectionResult>,
}

fn to_iced_color(color: overlay::Color) -> Color {
    Color::from_rgba8(color.r, color.g, color.b, color.a as f32 / 255.0)
}

/// Width of a label set in the monospace face at `LABEL_FONT_PX`.
fn label_width(text: &str) -> f32 {
    text.chars().count() as f32 * LABEL_FONT_PX * MONO_ADVANCE_EM
}

/// Draw target backed by an iced canvas frame.
struct FrameSurface<'a> {
    renderer: &'a Renderer,
    frame: Frame,
}

impl<'a> FrameSurface<'a> {
    fn new(renderer: &'a Renderer, size: Size) -> Self {
        Self {
            renderer,
            frame: Frame::new(renderer, size),
        }
    }

    fn into_geometry(self) -> Geometry {
        self.frame.into_geometry()
    }
}

impl DrawSurface for FrameSurface<'_> {
    fn resize(&mut self, size: overlay::Size) {
        self.frame = Frame::new(self.renderer, Size::new(size.width, size.height));
    }

    fn clear(&mut self) {
        self.frame = Frame::new(self.renderer, self.frame.size());
    }

    fn stroke_rect(&mut self, rect: DisplayRect, color: overlay::Color, line_width: f32) {
        self.frame.stroke_rectangle(
            Point::new(rect.x, rect.y),
            Size::new(rect.width, rect.height),
            Stroke::default()
                .with_width(line_width)
                .with_color(to_iced_color(color)),
        );
    }

    fn fill_rect(&mut self, rect: DisplayRect, color: overlay::Color) {
        self.frame.fill_rectangle(
            Point::new(rect.x, rect.y),
            Size::new(rect.width, rect.height),
            to_iced_color(color),
        );
    }

    fn fill_text(&mut self, text: &str, x: f32, baseline: f32, color: overlay::Color) {
        // Canvas text is positioned by its top edge; lift it by the ascent.
        self.frame.fill_text(canvas::Text {
            content: text.to_string(),
            position: Point::new(x, baseline - LABEL_FONT_PX * 0.8),
            color: to_iced_color(color),
            size: Pixels(LABEL_FONT_PX),
            font: Font::MONOSPACE,
            ..canvas::Text::default()
        });
    }

    fn measure_text(&self, text: &str) -> f32 {
        label_width(text)
    }
}

/// Canvas layer stacked over the image. It paints only once the shown
/// image's load signal has fired.
struct OverlayCanvas<'a> {
    view: &'a ResultsView,
    armed: bool,
}

impl canvas::Program<Message> for OverlayCanvas<'_> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut surface = FrameSurface::new(renderer, bounds.size());
        if self.armed {
            self.view
                .render_in(&mut surface, overlay::Size::new(bounds.width, bounds.height));
        }
        vec![surface.into_geometry()]
    }
}
