use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use mirra_api::{MacAddress, Message, MessageType, wire};

use crate::radio::Radio;

type FrameFilter = Box<dyn FnMut(&Message) -> bool>;

#[derive(Debug, Clone)]
struct Frame {
    data: Vec<u8>,
    crc_valid: bool,
}

struct Port {
    mac: MacAddress,
    inbox: Channel<NoopRawMutex, Frame, 16>,
    listening: Cell<bool>,
}

#[derive(Default)]
struct Medium {
    ports: RefCell<Vec<Rc<Port>>>,
    transmitted: RefCell<Vec<Message>>,
    loss: RefCell<Option<FrameFilter>>,
    corruption: RefCell<Option<FrameFilter>>,
}

/// Shared radio medium. Every frame reaches every radio that is currently
/// in receive mode, addressing is left to the receiver.
#[derive(Clone, Default)]
pub struct MockAir {
    medium: Rc<Medium>,
}

impl MockAir {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn radio(&self, mac: MacAddress) -> MockRadio {
        let port = Rc::new(Port {
            mac,
            inbox: Channel::new(),
            listening: Cell::new(false),
        });
        self.medium.ports.borrow_mut().push(port.clone());

        MockRadio {
            air: self.clone(),
            port,
            current: None,
        }
    }

    /// Drops every frame for which `filter` returns true.
    pub fn set_loss<F>(&self, filter: F)
    where
        F: FnMut(&Message) -> bool + 'static,
    {
        *self.medium.loss.borrow_mut() = Some(Box::new(filter));
    }

    /// Delivers frames for which `filter` returns true with a bad CRC.
    pub fn set_corruption<F>(&self, filter: F)
    where
        F: FnMut(&Message) -> bool + 'static,
    {
        *self.medium.corruption.borrow_mut() = Some(Box::new(filter));
    }

    pub fn clear_faults(&self) {
        self.medium.loss.borrow_mut().take();
        self.medium.corruption.borrow_mut().take();
    }

    /// Every frame put on the air so far, lost ones included.
    pub fn transmitted(&self) -> Vec<Message> {
        self.medium.transmitted.borrow().clone()
    }

    pub fn count(&self, message_type: MessageType) -> usize {
        self.medium
            .transmitted
            .borrow()
            .iter()
            .filter(|message| message.is_type(message_type))
            .count()
    }

    fn broadcast(&self, from: &Rc<Port>, data: &[u8]) {
        let mut crc_valid = true;

        if let Ok(message) = wire::decode(data) {
            self.medium.transmitted.borrow_mut().push(message.clone());

            if let Some(filter) = self.medium.loss.borrow_mut().as_mut() {
                if filter(&message) {
                    log::debug!("{} from {} lost", message.message_type(), message.source());
                    return;
                }
            }
            if let Some(filter) = self.medium.corruption.borrow_mut().as_mut() {
                crc_valid = !filter(&message);
            }
        }

        for port in self.medium.ports.borrow().iter() {
            if Rc::ptr_eq(port, from) || !port.listening.get() {
                continue;
            }
            let frame = Frame {
                data: data.to_vec(),
                crc_valid,
            };
            if port.inbox.try_send(frame).is_err() {
                log::warn!("Inbox of {} full, frame dropped", port.mac);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockRadioError {
    NoPacket,
}

pub struct MockRadio {
    air: MockAir,
    port: Rc<Port>,
    current: Option<Frame>,
}

impl Radio for MockRadio {
    type Error = MockRadioError;

    fn mac_address(&self) -> MacAddress {
        self.port.mac
    }

    async fn transmit(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.port.listening.set(false);
        self.air.broadcast(&self.port, data);
        Ok(())
    }

    fn start_receive(&mut self) -> Result<(), Self::Error> {
        self.port.listening.set(true);
        Ok(())
    }

    async fn wait_for_interrupt(&mut self) {
        let frame = self.port.inbox.receive().await;
        self.port.listening.set(false);
        self.current = Some(frame);
    }

    fn packet_length(&mut self) -> usize {
        self.current.as_ref().map_or(0, |frame| frame.data.len())
    }

    fn read_data(&mut self, buffer: &mut [u8]) -> Result<(), Self::Error> {
        let frame = self.current.as_ref().ok_or(MockRadioError::NoPacket)?;
        let count = buffer.len().min(frame.data.len());
        buffer[..count].copy_from_slice(&frame.data[..count]);
        Ok(())
    }

    fn crc_valid(&mut self) -> bool {
        self.current.as_ref().is_some_and(|frame| frame.crc_valid)
    }

    fn sleep(&mut self) -> Result<(), Self::Error> {
        self.port.listening.set(false);
        while self.port.inbox.try_receive().is_ok() {}
        Ok(())
    }
}
