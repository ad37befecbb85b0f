//! Analog channels of the acquisition board.
//!
//! The board has exactly two channels. Per-channel state is kept in
//! [`ChannelMap`], a fixed two-slot array indexed by [`Channel`], so every
//! channel is always present and only its contents say whether it is in use.

use crate::error::{AppResult, DaqError};
use std::fmt;
use std::ops::{Index, IndexMut};

/// One of the two analog channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    /// Channel 1, packets opened by `H`
    One,
    /// Channel 2, packets opened by `I`
    Two,
}

impl Channel {
    /// Both channels in numeric order.
    pub const ALL: [Channel; 2] = [Channel::One, Channel::Two];

    /// Channel from its 1-based number.
    pub fn from_number(number: u8) -> AppResult<Self> {
        match number {
            1 => Ok(Channel::One),
            2 => Ok(Channel::Two),
            other => Err(DaqError::InvalidChannel(other)),
        }
    }

    /// Channel whose packets start with `byte`, if it is a marker byte.
    pub fn from_marker(byte: u8) -> Option<Self> {
        match byte {
            b'H' => Some(Channel::One),
            b'I' => Some(Channel::Two),
            _ => None,
        }
    }

    /// Marker byte that opens this channel's packets.
    pub fn marker(self) -> u8 {
        match self {
            Channel::One => b'H',
            Channel::Two => b'I',
        }
    }

    /// 1-based channel number.
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    /// 0-based slot index.
    pub fn index(self) -> usize {
        match self {
            Channel::One => 0,
            Channel::Two => 1,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CH{}", self.number())
    }
}

/// Fixed per-channel storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelMap<T>([T; 2]);

impl<T> ChannelMap<T> {
    /// Build from one value per channel.
    pub fn new(one: T, two: T) -> Self {
        Self([one, two])
    }

    /// Build by calling `f` for each channel.
    pub fn from_fn(mut f: impl FnMut(Channel) -> T) -> Self {
        Self([f(Channel::One), f(Channel::Two)])
    }

    /// Iterate `(channel, value)` in channel order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &T)> {
        Channel::ALL.into_iter().zip(self.0.iter())
    }

    /// Iterate `(channel, value)` mutably in channel order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Channel, &mut T)> {
        Channel::ALL.into_iter().zip(self.0.iter_mut())
    }
}

impl<T> Index<Channel> for ChannelMap<T> {
    type Output = T;

    fn index(&self, channel: Channel) -> &T {
        &self.0[channel.index()]
    }
}

impl<T> IndexMut<Channel> for ChannelMap<T> {
    fn index_mut(&mut self, channel: Channel) -> &mut T {
        &mut self.0[channel.index()]
    }
}

/// Set of selected channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelSet(ChannelMap<bool>);

impl ChannelSet {
    /// Empty selection.
    pub fn none() -> Self {
        Self::default()
    }

    /// Both channels.
    pub fn all() -> Self {
        Self(ChannelMap::new(true, true))
    }

    /// Selection from 1-based channel numbers; rejects anything but 1 and 2.
    pub fn from_numbers(numbers: &[u8]) -> AppResult<Self> {
        let mut set = Self::none();
        for number in numbers {
            set.insert(Channel::from_number(*number)?);
        }
        Ok(set)
    }

    /// Add a channel.
    pub fn insert(&mut self, channel: Channel) {
        self.0[channel] = true;
    }

    /// Whether `channel` is selected.
    pub fn contains(&self, channel: Channel) -> bool {
        self.0[channel]
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|(_, on)| *on)
    }

    /// Selected channels in numeric order.
    pub fn iter(&self) -> impl Iterator<Item = Channel> + '_ {
        self.0.iter().filter(|(_, on)| **on).map(|(ch, _)| ch)
    }
}
