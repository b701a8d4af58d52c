use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::mpsc;
use std::time::Duration;

/// Creates the queue through which other threads hand messages to the owner thread.
pub fn owner_channel<M>() -> (Poster<M>, Mailbox<M>) {
    let (tx, rx) = mpsc::channel();
    (
        Poster { tx },
        Mailbox {
            rx,
            _owner: PhantomData,
        },
    )
}

/// Sending half; cheap to clone and usable from any thread.
#[derive(Debug)]
pub struct Poster<M> {
    tx: mpsc::Sender<M>,
}

impl<M> Clone for Poster<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<M> Poster<M> {
    /// Queues `msg` for the owner. Returns false once the owner is gone.
    pub fn post(&self, msg: M) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// Receiving half. Not `Send`: it stays on the thread that created it.
#[derive(Debug)]
pub struct Mailbox<M> {
    rx: mpsc::Receiver<M>,
    _owner: PhantomData<Rc<()>>,
}

impl<M> Mailbox<M> {
    pub fn recv_timeout(&self, timeout: Duration) -> Option<M> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn drain(&self) -> Vec<M> {
        self.rx.try_iter().collect()
    }
}
