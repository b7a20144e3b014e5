use crate::interfaces::dragsim_interface::DragsimInterface;
use dragsim::core::session::{GameState, Season, SCREEN_HEIGHT, SCREEN_WIDTH};
use dragsim::core::vehicle::{CAR_HEIGHT, CAR_WIDTH};
use dragsim::interfaces::gui_interface::{FrameState, InputMsg, SpriteColors};
use dragsim::interfaces::input::{InputState, Key};
use dragsim::interfaces::render::{DrawCmd, RgbColor, RgbaColor, SpriteId, TextSize};
use eframe::{egui, epi};
use flume::{Receiver, Sender};
use helpers::buffer::RingBuffer;
use std::time::Instant;

/// Road band the lanes are drawn on (game coordinates).
const ROAD_TOP: f32 = 320.0;
const ROAD_BOTTOM: f32 = 470.0;

#[derive(Debug)]
pub struct RaceView {
    pub dragsim_interface: DragsimInterface,
    pub prev_update: Instant,
    pub prev_update_durations: RingBuffer<u32>,
    pub show_fps: bool,
}

impl RaceView {
    pub fn new(rx: Receiver<FrameState>, tx: Sender<InputMsg>) -> RaceView {
        RaceView {
            dragsim_interface: DragsimInterface::new(rx, tx),
            prev_update: Instant::now(),
            prev_update_durations: RingBuffer::new(30),
            show_fps: false,
        }
    }

    /// collect_input reads the keyboard state of this GUI frame.
    fn collect_input(&mut self, ctx: &egui::CtxRef) -> (InputState, Vec<Key>) {
        let input = ctx.input();
        let mut keys = InputState::new();
        let mut pressed = Vec::new();

        for key in input.keys_down.iter() {
            if let Some(key) = map_key(*key) {
                keys.press(key);
            }
        }
        // egui only reports shift as a modifier
        if input.modifiers.shift {
            keys.press(Key::LeftShift);
        }

        for event in input.events.iter() {
            if let egui::Event::Key {
                key, pressed: true, ..
            } = event
            {
                if *key == egui::Key::F {
                    self.show_fps = !self.show_fps;
                } else if let Some(key) = map_key(*key) {
                    pressed.push(key);
                }
            }
        }

        (keys, pressed)
    }

    pub fn set_ui_content(&mut self, ui: &mut egui::Ui) -> egui::Response {
        // PREPARATIONS ----------------------------------------------------------------------------
        // get UI handles
        let (response, painter) =
            ui.allocate_painter(ui.available_size_before_wrap_finite(), egui::Sense::hover());

        // fit the game screen into the available area and keep its aspect ratio
        let game_aspect = (SCREEN_WIDTH / SCREEN_HEIGHT) as f32;
        let screen_width = response.rect.width();
        let screen_height = response.rect.height();

        let dest_rect = if screen_width / screen_height > game_aspect {
            // screen is wider -> fit height
            let new_width = screen_height * game_aspect;
            let offset_x = (screen_width - new_width) / 2.0;
            egui::Rect::from_min_size(
                egui::Pos2::new(response.rect.min.x + offset_x, response.rect.min.y),
                egui::Vec2::new(new_width, screen_height),
            )
        } else {
            // screen is taller -> fit width
            let new_height = screen_width / game_aspect;
            let offset_y = (screen_height - new_height) / 2.0;
            egui::Rect::from_min_size(
                egui::Pos2::new(response.rect.min.x, response.rect.min.y + offset_y),
                egui::Vec2::new(screen_width, new_height),
            )
        };

        let to_screen = egui::emath::RectTransform::from_to(
            egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::Vec2::new(SCREEN_WIDTH as f32, SCREEN_HEIGHT as f32),
            ),
            dest_rect,
        );

        // create vector for drawn shapes
        let mut shapes = vec![];

        // FRAME DRAWING ---------------------------------------------------------------------------
        if let Some(frame_state) = &self.dragsim_interface.frame_state {
            let mut painter_ctx = ShapeBuilder {
                to_screen,
                sprite_colors: frame_state.sprite_colors,
                shapes: &mut shapes,
            };
            for cmd in frame_state.draw_cmds.iter() {
                painter_ctx.add_cmd(ui, cmd);
            }
        } else {
            shapes.push(egui::Shape::text(
                ui.fonts(),
                dest_rect.center(),
                egui::Align2::CENTER_CENTER,
                "Waiting for the simulator...",
                egui::TextStyle::Heading,
                egui::Color32::WHITE,
            ));
        }

        // calculate current UI update duration, append it to the buffer, and set update time
        self.prev_update_durations
            .push(self.prev_update.elapsed().as_millis() as u32);
        self.prev_update = Instant::now();

        if self.show_fps {
            let info_text = match self.prev_update_durations.get_avg() {
                Some(avg) if avg > 0.0 => format!("GUI update frequency: {:.0} Hz", 1000.0 / avg),
                _ => String::new(),
            };
            shapes.push(egui::Shape::text(
                ui.fonts(),
                dest_rect.right_bottom() - egui::Vec2::new(10.0, 10.0),
                egui::Align2::RIGHT_BOTTOM,
                &info_text,
                egui::TextStyle::Small,
                egui::Color32::WHITE,
            ));
        }

        // DRAWING ---------------------------------------------------------------------------------
        // update shapes in UI painter and return response
        painter.extend(shapes);
        response
    }

    fn show_results(&self, ctx: &egui::CtxRef) {
        let result = match &self.dragsim_interface.final_result {
            Some(result) => result,
            None => return,
        };

        egui::Window::new("Results")
            .default_pos(egui::Pos2::new(20.0, 400.0))
            .show(ctx, |ui| {
                for (pos, &idx) in result.standings().iter().enumerate() {
                    let v = &result.vehicles[idx];
                    let time = match v.race_time_s {
                        Some(t) => format!("{:.3}s", t),
                        None => String::from("DNF"),
                    };
                    ui.label(format!(
                        "{}. {} {} (jumps {}, spin-outs {}, penalties {}, boosts {})",
                        pos + 1,
                        v.name,
                        time,
                        v.jumps,
                        v.spin_outs,
                        v.penalties,
                        v.boosts
                    ));
                }
            });
    }
}

impl epi::App for RaceView {
    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::CtxRef, frame: &mut epi::Frame) {
        // forward keyboard input and update race interface
        let (keys, pressed) = self.collect_input(ctx);
        let quit = pressed.contains(&Key::Escape);
        self.dragsim_interface.send_input(keys, &pressed);
        self.dragsim_interface.update();

        if quit {
            self.dragsim_interface.quit();
            frame.quit();
        }

        // update UI content
        egui::CentralPanel::default().show(ctx, |ui| {
            let mut canvas = egui::Frame::dark_canvas(ui.style());
            canvas.fill = egui::Color32::BLACK;
            canvas.show(ui, |ui| {
                self.set_ui_content(ui);
            });
        });

        let finished = matches!(
            self.dragsim_interface.frame_state.as_ref().map(|f| f.game_state),
            Some(GameState::Finished)
        );
        if finished {
            self.show_results(ctx);
        }

        // request repaint of the UI
        ctx.request_repaint();
    }

    fn on_exit(&mut self) {
        self.dragsim_interface.quit();
    }

    fn name(&self) -> &str {
        "Pixel Drag Race"
    }
}

/// ShapeBuilder converts draw commands from game coordinates into egui shapes.
struct ShapeBuilder<'a> {
    to_screen: egui::emath::RectTransform,
    sprite_colors: SpriteColors,
    shapes: &'a mut Vec<egui::Shape>,
}

impl<'a> ShapeBuilder<'a> {
    fn pos(&self, x: f64, y: f64) -> egui::Pos2 {
        self.to_screen * egui::Pos2::new(x as f32, y as f32)
    }

    fn len(&self, l: f64) -> f32 {
        l as f32 * self.to_screen.scale().x
    }

    fn add_cmd(&mut self, ui: &egui::Ui, cmd: &DrawCmd) {
        match cmd {
            DrawCmd::Blit { sprite, x, y } => self.add_sprite(*sprite, *x, *y, 0.0),
            DrawCmd::BlitRotated {
                sprite,
                x,
                y,
                angle,
            } => self.add_sprite(*sprite, *x, *y, *angle),
            DrawCmd::Circle {
                color,
                center,
                radius,
            } => {
                let shape = egui::Shape::circle_filled(
                    self.pos(center.0, center.1),
                    self.len(*radius),
                    rgba(*color),
                );
                self.shapes.push(shape);
            }
            DrawCmd::Rect { color, x, y, w, h } => {
                let rect = egui::Rect::from_two_pos(self.pos(*x, *y), self.pos(x + w, y + h));
                self.shapes.push(egui::Shape::rect_filled(rect, 0.0, rgba(*color)));
            }
            DrawCmd::Line {
                color,
                from,
                to,
                width,
            } => {
                let shape = egui::Shape::line_segment(
                    [self.pos(from.0, from.1), self.pos(to.0, to.1)],
                    egui::Stroke::new(self.len(*width), rgba(*color)),
                );
                self.shapes.push(shape);
            }
            DrawCmd::Polygon { color, points } => {
                let points = points.iter().map(|p| self.pos(p.0, p.1)).collect();
                self.shapes.push(egui::Shape::convex_polygon(
                    points,
                    rgba(*color),
                    egui::Stroke::none(),
                ));
            }
            DrawCmd::Text {
                text,
                x,
                y,
                size,
                color,
            } => {
                let text_style = match size {
                    TextSize::Small => egui::TextStyle::Body,
                    TextSize::Large => egui::TextStyle::Heading,
                };
                let shape = egui::Shape::text(
                    ui.fonts(),
                    self.pos(*x, *y),
                    egui::Align2::LEFT_TOP,
                    text,
                    text_style,
                    rgba(*color),
                );
                self.shapes.push(shape);
            }
        }
    }

    fn add_sprite(&mut self, sprite: SpriteId, x: f64, y: f64, angle: f64) {
        match sprite {
            SpriteId::Background(season) => self.add_background(season),
            SpriteId::PlayerCar => self.add_car(self.sprite_colors.player, x, y, angle),
            SpriteId::OpponentCar => self.add_car(self.sprite_colors.opponent, x, y, angle),
        }
    }

    /// add_background paints sky, ground and road in the colours of the season.
    fn add_background(&mut self, season: Season) {
        let (sky, ground) = match season {
            Season::Spring => (rgb(135, 206, 235), rgb(90, 170, 90)),
            Season::Summer => (rgb(100, 180, 255), rgb(120, 170, 60)),
            Season::Autumn => (rgb(180, 160, 140), rgb(150, 100, 50)),
            Season::Winter => (rgb(200, 210, 230), rgb(235, 235, 245)),
        };
        let (w, h) = (SCREEN_WIDTH as f32, SCREEN_HEIGHT as f32);
        let rect = |y0: f32, y1: f32| {
            egui::Rect::from_two_pos(egui::Pos2::new(0.0, y0), egui::Pos2::new(w, y1))
        };

        let bands = [
            (rect(0.0, ROAD_TOP - 60.0), sky),
            (rect(ROAD_TOP - 60.0, h), ground),
            (rect(ROAD_TOP, ROAD_BOTTOM), egui::Color32::from_gray(70)),
        ];
        for (band, color) in bands {
            let band = egui::Rect::from_two_pos(self.to_screen * band.min, self.to_screen * band.max);
            self.shapes.push(egui::Shape::rect_filled(band, 0.0, color));
        }

        // dashed lane divider
        let divider_y = ((ROAD_TOP + ROAD_BOTTOM) / 2.0) as f64;
        let mut x = 0.0;
        while x < SCREEN_WIDTH {
            let shape = egui::Shape::line_segment(
                [self.pos(x, divider_y), self.pos(x + 20.0, divider_y)],
                egui::Stroke::new(self.len(2.0), egui::Color32::WHITE),
            );
            self.shapes.push(shape);
            x += 40.0;
        }
    }

    /// add_car paints a car with its top left corner at (x, y), rotated counter-clockwise by
    /// `angle` degrees around its centre.
    fn add_car(&mut self, color: RgbColor, x: f64, y: f64, angle: f64) {
        let center = (x + CAR_WIDTH / 2.0, y + CAR_HEIGHT / 2.0);
        let (sin, cos) = angle.to_radians().sin_cos();
        let rotate = |px: f64, py: f64| {
            let (dx, dy) = (px - CAR_WIDTH / 2.0, py - CAR_HEIGHT / 2.0);
            self.pos(center.0 + dx * cos + dy * sin, center.1 - dx * sin + dy * cos)
        };
        let quad = |x0: f64, y0: f64, x1: f64, y1: f64| {
            vec![rotate(x0, y0), rotate(x1, y0), rotate(x1, y1), rotate(x0, y1)]
        };

        let body = egui::Color32::from_rgb(color.r, color.g, color.b);
        let cabin = egui::Color32::from_rgb(color.r / 2, color.g / 2, color.b / 2);
        let wheels = [rotate(18.0, 34.0), rotate(62.0, 34.0)];
        let parts = [
            (quad(0.0, 12.0, CAR_WIDTH, 32.0), body),
            (quad(22.0, 2.0, 56.0, 14.0), cabin),
            (quad(70.0, 16.0, CAR_WIDTH, 22.0), egui::Color32::from_rgb(255, 240, 150)),
        ];

        for (points, fill) in parts {
            self.shapes
                .push(egui::Shape::convex_polygon(points, fill, egui::Stroke::none()));
        }
        let wheel_radius = self.len(7.0);
        for wheel in wheels {
            self.shapes
                .push(egui::Shape::circle_filled(wheel, wheel_radius, egui::Color32::BLACK));
        }
    }
}

/// map_key translates egui keys into the keys the game reacts to.
pub fn map_key(key: egui::Key) -> Option<Key> {
    match key {
        egui::Key::ArrowUp => Some(Key::ArrowUp),
        egui::Key::ArrowRight => Some(Key::ArrowRight),
        egui::Key::Space => Some(Key::Space),
        egui::Key::W => Some(Key::W),
        egui::Key::D => Some(Key::D),
        egui::Key::R => Some(Key::R),
        egui::Key::T => Some(Key::T),
        egui::Key::Escape => Some(Key::Escape),
        _ => None,
    }
}

fn rgb(r: u8, g: u8, b: u8) -> egui::Color32 {
    egui::Color32::from_rgb(r, g, b)
}

fn rgba(c: RgbaColor) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_game_keys_are_mapped() {
        assert_eq!(map_key(egui::Key::W), Some(Key::W));
        assert_eq!(map_key(egui::Key::Escape), Some(Key::Escape));
        assert_eq!(map_key(egui::Key::Q), None);
    }

    #[test]
    fn alpha_is_kept_when_converting_colors() {
        let c = rgba(RgbaColor {
            r: 255,
            g: 0,
            b: 0,
            a: 255,
        });
        assert_eq!(c, egui::Color32::RED);
    }
}
