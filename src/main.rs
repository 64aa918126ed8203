#[cfg(feature = "gui")]
use eframe::egui;

#[cfg(feature = "gui")]
use drumfill::{
    default_config_path, load_config, midi_note_name, pitch_for_row, save_config, AudioOutput,
    Cell, Command, DrumKit, DrumfillConfig, EntryMode, MidiOutputDevice, Percussion, PlayMode,
    SequencerSession, Timbre, MAX_BPM, MAX_SIZE, MIN_BPM, MIN_SIZE,
};
#[cfg(feature = "gui")]
use std::time::Instant;

#[cfg(feature = "gui")]
fn main() -> Result<(), eframe::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config(&default_config_path());
    let link = std::env::args().nth(1);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([820.0, 900.0])
            .with_title("drum fill: construct a beat"),
        ..Default::default()
    };

    eframe::run_native(
        "drumfill",
        options,
        Box::new(move |_cc| Ok(Box::new(SequencerApp::new(config, link.as_deref())))),
    )
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

#[cfg(feature = "gui")]
struct SequencerApp {
    session: SequencerSession,
    config: DrumfillConfig,
    audio_output: AudioOutput,
    midi_output: MidiOutputDevice,
    origin: Instant,

    // UI state
    available_midi_ports: Vec<String>,
    selected_port: Option<usize>,
    selected_cell: Option<(usize, usize)>,
    link_text: String,
    status: Option<String>,
}

#[cfg(feature = "gui")]
impl SequencerApp {
    fn new(config: DrumfillConfig, link: Option<&str>) -> Self {
        let origin = Instant::now();
        let session = match link {
            Some(link) => SequencerSession::from_link(link, &config),
            None => SequencerSession::from_config(&config),
        };

        let mut audio_output = if config.sound.audio_enabled {
            AudioOutput::new(origin).unwrap_or_else(|e| {
                log::warn!("{}, continuing without audio", e);
                AudioOutput::silent()
            })
        } else {
            AudioOutput::silent()
        };
        audio_output.set_timbre(session.timbre());
        audio_output.set_kit(session.kit());

        let available_midi_ports = MidiOutputDevice::available_ports();
        let mut midi_output = MidiOutputDevice::new();
        let mut selected_port = None;
        if let Some(pattern) = &config.sound.midi_port {
            match midi_output.connect_matching(pattern) {
                Ok(()) => {
                    let pattern = pattern.to_lowercase();
                    selected_port = available_midi_ports
                        .iter()
                        .position(|name| name.to_lowercase().contains(&pattern));
                }
                Err(e) => log::warn!("{}", e),
            }
        }

        Self {
            session,
            config,
            audio_output,
            midi_output,
            origin,
            available_midi_ports,
            selected_port,
            selected_cell: None,
            link_text: String::new(),
            status: None,
        }
    }

    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::SetTimbre(timbre) => self.audio_output.set_timbre(timbre),
            Command::SetKit(kit) => self.audio_output.set_kit(kit),
            _ => {}
        }

        let was_running = self.session.is_running();
        self.session.handle(command);
        if was_running && !self.session.is_running() {
            self.audio_output.stop_all();
            self.midi_output.all_notes_off();
        }
    }

    fn run_scheduler(&mut self) {
        let now = self.now();
        self.midi_output.release_due(now);
        let mut sinks = (&mut self.audio_output, &mut self.midi_output);
        self.session.poll(now, &mut sinks);
    }

    fn handle_typing(&mut self, ctx: &egui::Context) {
        if self.session.entry_mode() != EntryMode::Letter {
            return;
        }
        let Some((row, col)) = self.selected_cell else {
            return;
        };
        // Typing into the link field
        if ctx.wants_keyboard_input() {
            return;
        }

        let events = ctx.input(|i| i.events.clone());
        for event in events {
            match event {
                egui::Event::Text(text) => {
                    if let Some(ch) = text.chars().next() {
                        self.apply(Command::EnterLetter {
                            row,
                            col,
                            letter: Some(ch),
                        });
                        let size = self.session.grid().size();
                        if col + 1 < size {
                            self.selected_cell = Some((row, col + 1));
                        }
                    }
                }
                egui::Event::Key {
                    key: egui::Key::Backspace | egui::Key::Delete,
                    pressed: true,
                    ..
                } => self.apply(Command::EnterLetter {
                    row,
                    col,
                    letter: None,
                }),
                _ => {}
            }
        }
    }

    fn save_settings(&mut self) {
        self.config.grid.size = self.session.grid().size();
        self.config.playback.bpm = self.session.bpm();
        self.config.playback.mode = self.session.play_mode();
        self.config.sound.timbre = self.session.timbre();
        self.config.sound.kit = self.session.kit();
        self.config.entry_mode = self.session.entry_mode();
        self.config.sound.midi_port = self
            .selected_port
            .and_then(|i| self.available_midi_ports.get(i).cloned());

        self.status = Some(match save_config(&self.config, &default_config_path()) {
            Ok(()) => "Settings saved".to_string(),
            Err(e) => format!("Could not save settings: {}", e),
        });
    }

    fn transport_ui(&mut self, ui: &mut egui::Ui) {
        let mut commands = Vec::new();

        ui.horizontal(|ui| {
            let label = if self.session.is_running() {
                "⏸ Stop"
            } else {
                "▶ Play"
            };
            if ui.button(label).clicked() {
                commands.push(Command::TogglePlay);
            }

            ui.add_space(20.0);

            ui.label("BPM:");
            let mut bpm = self.session.bpm();
            if ui.add(egui::Slider::new(&mut bpm, MIN_BPM..=MAX_BPM)).changed() {
                commands.push(Command::ChangeTempo(bpm));
            }

            ui.add_space(20.0);

            ui.label("Grid size:");
            let mut size = self.session.grid().size();
            if ui.add(egui::Slider::new(&mut size, MIN_SIZE..=MAX_SIZE)).changed() {
                commands.push(Command::Resize(size));
            }
        });

        ui.horizontal(|ui| {
            ui.label("Play:");
            let mode = self.session.play_mode();
            for (value, text) in [(PlayMode::Grid, "grid"), (PlayMode::Word, "words")] {
                if ui.selectable_label(mode == value, text).clicked() {
                    commands.push(Command::ChangeMode(value));
                }
            }

            ui.add_space(20.0);

            ui.label("Click:");
            let entry = self.session.entry_mode();
            for (value, text) in [(EntryMode::Block, "blocks"), (EntryMode::Letter, "letters")] {
                if ui.selectable_label(entry == value, text).clicked() {
                    commands.push(Command::SetEntryMode(value));
                }
            }

            ui.add_space(20.0);

            let mut timbre = self.session.timbre();
            egui::ComboBox::from_label("tone")
                .selected_text(timbre.label())
                .show_ui(ui, |ui| {
                    for value in Timbre::ALL {
                        ui.selectable_value(&mut timbre, value, value.label());
                    }
                });
            if timbre != self.session.timbre() {
                commands.push(Command::SetTimbre(timbre));
            }

            let mut kit = self.session.kit();
            egui::ComboBox::from_label("kit")
                .selected_text(kit.label())
                .show_ui(ui, |ui| {
                    for value in DrumKit::ALL {
                        ui.selectable_value(&mut kit, value, value.label());
                    }
                });
            if kit != self.session.kit() {
                commands.push(Command::SetKit(kit));
            }
        });

        ui.horizontal(|ui| {
            if ui.button("clear blocks").clicked() {
                commands.push(Command::ClearBlocks);
            }
            if ui.button("clear letters").clicked() {
                commands.push(Command::ClearLetters);
            }
        });

        for command in commands {
            self.apply(command);
        }
    }

    fn grid_ui(&mut self, ui: &mut egui::Ui) {
        let shift = ui.input(|i| i.modifiers.shift);
        let entry_mode = self.session.entry_mode();
        let size = self.session.grid().size();
        let mut clicked = None;

        egui::Grid::new("cells")
            .spacing([2.0, 2.0])
            .show(ui, |ui| {
                let grid = self.session.grid();
                let scheduler = self.session.scheduler();
                for row in 0..size {
                    for col in 0..size {
                        let cell = grid.get(row, col).unwrap_or_default();
                        let number = grid
                            .number(row, col)
                            .map(|n| n.to_string())
                            .unwrap_or_default();
                        let text = match cell.letter() {
                            Some(letter) => format!("{}\n{}", number, letter),
                            None => format!("{}\n ", number),
                        };

                        let fill = if scheduler.is_playing(row, col) {
                            egui::Color32::from_rgb(100, 200, 100)
                        } else if scheduler.is_active(row, col) {
                            egui::Color32::from_rgb(60, 110, 60)
                        } else if cell == Cell::Blocked {
                            egui::Color32::from_rgb(20, 20, 20)
                        } else if self.selected_cell == Some((row, col)) {
                            egui::Color32::from_rgb(60, 60, 200)
                        } else {
                            egui::Color32::from_rgb(200, 200, 190)
                        };
                        let text_color = if cell == Cell::Blocked {
                            egui::Color32::GRAY
                        } else {
                            egui::Color32::BLACK
                        };

                        let button = egui::Button::new(egui::RichText::new(text).color(text_color))
                            .min_size(egui::vec2(44.0, 44.0))
                            .fill(fill);
                        let response = ui
                            .add(button)
                            .on_hover_text(midi_note_name(pitch_for_row(row)));
                        if response.clicked() {
                            clicked = Some((row, col));
                        }
                    }
                    ui.end_row();
                }
            });

        if let Some((row, col)) = clicked {
            match entry_mode {
                EntryMode::Block => self.apply(Command::ToggleCell {
                    row,
                    col,
                    break_symmetry: shift,
                }),
                EntryMode::Letter => self.selected_cell = Some((row, col)),
            }
        }
    }

    fn output_ui(&mut self, ui: &mut egui::Ui) {
        let mut selected_port_changed = None;
        ui.horizontal(|ui| {
            ui.label("MIDI Output:");
            if self.available_midi_ports.is_empty() {
                ui.label("No MIDI ports available");
            } else {
                egui::ComboBox::from_label("")
                    .selected_text(
                        self.selected_port
                            .and_then(|i| self.available_midi_ports.get(i))
                            .map(String::as_str)
                            .unwrap_or("Select port..."),
                    )
                    .show_ui(ui, |ui| {
                        for (i, port_name) in self.available_midi_ports.iter().enumerate() {
                            if ui
                                .selectable_label(self.selected_port == Some(i), port_name)
                                .clicked()
                            {
                                selected_port_changed = Some(i);
                            }
                        }
                    });
            }
        });

        if let Some(port_idx) = selected_port_changed {
            match self.midi_output.connect(port_idx) {
                Ok(()) => self.selected_port = Some(port_idx),
                Err(e) => self.status = Some(e.to_string()),
            }
        }

        ui.horizontal(|ui| {
            if ui.button("share link").clicked() {
                self.link_text = self.session.share_link();
            }
            if ui.button("load link").clicked() {
                match self.session.load_link(&self.link_text) {
                    Ok(()) => {
                        self.audio_output.set_timbre(self.session.timbre());
                        self.audio_output.set_kit(self.session.kit());
                        self.selected_cell = None;
                        self.status = None;
                    }
                    Err(e) => self.status = Some(format!("Link not loaded: {}", e)),
                }
            }
            if ui.button("save settings").clicked() {
                self.save_settings();
            }
        });
        ui.text_edit_singleline(&mut self.link_text);
    }
}

#[cfg(feature = "gui")]
impl eframe::App for SequencerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        self.run_scheduler();
        self.handle_typing(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("drum fill: construct a beat");
            ui.add_space(10.0);

            self.transport_ui(ui);
            ui.add_space(10.0);
            self.grid_ui(ui);
            ui.add_space(10.0);

            ui.separator();
            self.output_ui(ui);

            let drums: Vec<String> = Percussion::ALL
                .iter()
                .map(|p| format!("{} {}", p.letter(), p.label()))
                .collect();
            ui.label(format!("Shift-click breaks symmetry. Drums: {}.", drums.join(", ")));
            if !self.audio_output.is_available() {
                ui.colored_label(egui::Color32::YELLOW, "⚠ No audio output - visual playback only");
            }
            if let Some(status) = &self.status {
                ui.label(status.as_str());
            }
        });
    }
}
