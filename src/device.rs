// Copyright (C) 2024 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::fmt;

use tracing::{info, warn};

use crate::poll::{Poll, PollTimeout};
use crate::system::{Invocation, System};

/// An ALSA playback card as listed by `aplay -l`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Card {
    /// The ALSA card index.
    pub index: u32,
    /// The full listing line, used for pattern matching.
    pub description: String,
}

impl Card {
    /// The ALSA hardware device string JACK is pointed at.
    pub fn hw(&self) -> String {
        format!("hw:{}", self.index)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.hw(), self.description)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("no audio device matching [{}] appeared: {timeout}", .patterns.join(", "))]
pub struct DeviceNotFound {
    pub patterns: Vec<String>,
    #[source]
    pub timeout: PollTimeout,
}

/// Parses `aplay -l` output. Lines look like:
///
/// card 1: Headphones [bcm2835 Headphones], device 0: bcm2835 Headphones [bcm2835 Headphones]
///
/// A card with several devices is listed once, at its first line.
pub fn parse_cards(listing: &str) -> Vec<Card> {
    let mut cards: Vec<Card> = Vec::new();
    for line in listing.lines() {
        let Some(rest) = line.strip_prefix("card ") else {
            continue;
        };
        let Some((index, _)) = rest.split_once(':') else {
            continue;
        };
        let Ok(index) = index.trim().parse::<u32>() else {
            continue;
        };
        if cards.iter().any(|card| card.index == index) {
            continue;
        }
        cards.push(Card {
            index,
            description: line.trim().to_string(),
        });
    }
    cards
}

/// Picks a card by pattern preference: every card is tried against the first
/// pattern before any card is tried against the second. Matching is a
/// case-insensitive substring match.
pub fn select_card<'a>(cards: &'a [Card], patterns: &[String]) -> Option<&'a Card> {
    patterns.iter().find_map(|pattern| {
        let pattern = pattern.to_lowercase();
        cards
            .iter()
            .find(|card| card.description.to_lowercase().contains(&pattern))
    })
}

/// Waits for a matching card to be enumerated, the same way the generated
/// start-jack script does.
pub fn wait_for_card(
    system: &dyn System,
    poll: &Poll,
    patterns: &[String],
) -> Result<Card, DeviceNotFound> {
    let listing = Invocation::new("aplay").arg("-l");
    poll.until(|| match system.run(&listing) {
        Ok(output) => select_card(&parse_cards(&output.stdout), patterns).cloned(),
        Err(e) => {
            warn!(err = %e, "Unable to list audio devices");
            None
        }
    })
    .map(|card| {
        info!(card = %card, "Found audio device.");
        card
    })
    .map_err(|timeout| DeviceNotFound {
        patterns: patterns.to_vec(),
        timeout,
    })
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::system::mock;

    const LISTING: &str = "\
**** List of PLAYBACK Hardware Devices ****
card 0: vc4hdmi [vc4-hdmi], device 0: MAI PCM i2s-hifi-0 [MAI PCM i2s-hifi-0]
  Subdevices: 1/1
  Subdevice #0: subdevice #0
card 1: Headphones [bcm2835 Headphones], device 0: bcm2835 Headphones [bcm2835 Headphones]
  Subdevices: 8/8
card 2: U192k [UMC202HD 192k], device 0: USB Audio [USB Audio]
  Subdevices: 1/1
card 2: U192k [UMC202HD 192k], device 1: USB Audio [USB Audio #1]
  Subdevices: 1/1
";

    fn patterns(patterns: &[&str]) -> Vec<String> {
        patterns.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_parse_cards() {
        let cards = parse_cards(LISTING);
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[0].index, 0);
        assert_eq!(cards[1].index, 1);
        assert_eq!(cards[2].index, 2);
        assert_eq!(cards[2].hw(), "hw:2");
        assert!(cards[2].description.contains("UMC202HD"));
    }

    #[test]
    fn test_pattern_order_wins_over_listing_order() {
        let cards = parse_cards(LISTING);
        let card = select_card(&cards, &patterns(&["USB", "UMC", "codec", "headphones"]));
        assert_eq!(card.map(|c| c.index), Some(2));

        let card = select_card(&cards, &patterns(&["headphones", "USB"]));
        assert_eq!(card.map(|c| c.index), Some(1));
    }

    #[test]
    fn test_no_match() {
        let cards = parse_cards(LISTING);
        assert_eq!(select_card(&cards, &patterns(&["scarlett"])), None);
        assert_eq!(select_card(&[], &patterns(&["USB"])), None);
    }

    #[test]
    fn test_wait_for_card() {
        let system = mock::System::new().respond("aplay -l", LISTING);
        let poll = Poll::new(Duration::from_millis(1), 3);
        let card = wait_for_card(&system, &poll, &patterns(&["codec", "headphones"])).unwrap();
        assert_eq!(card.index, 1);
        assert_eq!(system.calls().len(), 1);
    }

    #[test]
    fn test_wait_for_card_times_out() {
        let system = mock::System::new().fail("aplay -l", 1, "aplay: device_list:274: no soundcards found...");
        let poll = Poll::new(Duration::from_millis(1), 3);
        let err = wait_for_card(&system, &poll, &patterns(&["USB"])).unwrap_err();
        assert_eq!(err.timeout.attempts, 3);
        assert_eq!(system.calls().len(), 3);
    }
}
