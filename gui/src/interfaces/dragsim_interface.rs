use dragsim::interfaces::gui_interface::{FrameState, InputMsg};
use dragsim::interfaces::input::{InputState, Key};
use dragsim::post::race_result::RaceResult;
use flume::{Receiver, Sender};

/// DragsimInterface connects the GUI to the simulator thread.
#[derive(Debug)]
pub struct DragsimInterface {
    pub rx: Receiver<FrameState>,
    pub tx: Sender<InputMsg>,
    pub frame_state: Option<FrameState>,
    pub final_result: Option<RaceResult>,
    pub connected: bool,
}

impl DragsimInterface {
    pub fn new(rx: Receiver<FrameState>, tx: Sender<InputMsg>) -> DragsimInterface {
        DragsimInterface {
            rx,
            tx,
            frame_state: None,
            final_result: None,
            connected: true,
        }
    }

    /// update receives all frames sent since the last call and keeps the latest one.
    pub fn update(&mut self) {
        for frame in self.rx.try_iter() {
            if let Some(result) = &frame.final_result {
                self.final_result = Some(result.to_owned());
            }
            self.frame_state = Some(frame);
        }
    }

    /// send_input forwards the held keys and the key presses of the current GUI frame.
    pub fn send_input(&mut self, keys: InputState, pressed: &[Key]) {
        if !self.connected {
            return;
        }

        let mut send_result = self.tx.send(InputMsg::Keys(keys));
        for key in pressed.iter() {
            send_result = send_result.and_then(|_| self.tx.send(InputMsg::KeyPressed(*key)));
        }

        if send_result.is_err() {
            log::info!("Simulator thread stopped");
            self.connected = false;
        }
    }

    pub fn quit(&mut self) {
        if self.connected {
            // the simulator may already be gone, nothing left to tell it then
            let _ = self.tx.send(InputMsg::Quit);
            self.connected = false;
        }
    }
}
