// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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

//! File templates. Substitution points are written `{{name}}`; everything else
//! is copied verbatim.

use super::Template;

pub const LIMITS_HEADER: Template = Template::new(
    "limits header",
    r#"# Generated by drumpi. Local changes are overwritten on the next provisioning run.
# Realtime scheduling and unlimited memory locking for the audio groups.
"#,
);

pub const LIMITS_ENTRY: Template = Template::new(
    "limits entry",
    r#"@{{group}} - rtprio {{rtprio}}
@{{group}} - memlock unlimited
"#,
);

pub const START_JACK: Template = Template::new(
    "start-jack",
    r#"#!/bin/sh
# Generated by drumpi. Local changes are overwritten on the next provisioning run.
#
# Waits for the audio interface to be enumerated, then runs the JACK server on it.
set -eu

PATTERNS="{{device_patterns}}"
ATTEMPTS={{attempts}}
INTERVAL={{interval}}

find_card() {
    listing=$(aplay -l 2>/dev/null) || return 1
    for pattern in $PATTERNS; do
        card=$(printf '%s\n' "$listing" | grep '^card [0-9]*:' | grep -i -- "$pattern" | head -n 1 | sed -n 's/^card \([0-9]*\):.*/\1/p')
        if [ -n "$card" ]; then
            echo "$card"
            return 0
        fi
    done
    return 1
}

attempt=1
until CARD=$(find_card); do
    if [ "$attempt" -ge "$ATTEMPTS" ]; then
        echo "no audio device matching [$PATTERNS] after $ATTEMPTS attempts" >&2
        exit 1
    fi
    attempt=$((attempt + 1))
    sleep "$INTERVAL"
done

echo "starting JACK on hw:$CARD"
exec jackd -R -P {{priority}} -d alsa -d "hw:$CARD" -r {{sample_rate}} -p {{period}} -n {{periods}}
"#,
);

pub const START_DRUMGIZMO: Template = Template::new(
    "start-drumgizmo",
    r#"#!/bin/sh
# Generated by drumpi. Local changes are overwritten on the next provisioning run.
#
# Waits for the JACK server to expose its playback ports, then runs DrumGizmo.
set -eu

ATTEMPTS={{attempts}}
INTERVAL={{interval}}

attempt=1
until jack_lsp 2>/dev/null | grep -qx '{{ready_port}}'; do
    if [ "$attempt" -ge "$ATTEMPTS" ]; then
        echo "JACK port {{ready_port}} not available after $ATTEMPTS attempts" >&2
        exit 1
    fi
    attempt=$((attempt + 1))
    sleep "$INTERVAL"
done

# Bridge ALSA MIDI (USB drum modules) into JACK.
a2jmidid -e &

exec drumgizmo -i jackmidi -I midimap={{midimap}} -o jackaudio {{kit_descriptor}}
"#,
);

pub const JACKD_SERVICE: Template = Template::new(
    "jackd.service",
    r#"[Unit]
Description=JACK audio server for the drum engine
After=sound.target

[Service]
Type=simple
User={{user}}
Environment=JACK_NO_AUDIO_RESERVATION=1
ExecStart={{start_jack}}
Restart=on-failure
RestartSec=1
LimitRTPRIO={{rtprio}}
LimitMEMLOCK=infinity

[Install]
WantedBy=multi-user.target
"#,
);

pub const DRUMGIZMO_SERVICE: Template = Template::new(
    "drumgizmo.service",
    r#"[Unit]
Description=DrumGizmo drum sampler
After=jackd.service
Requires=jackd.service
ConditionPathExists={{kit_descriptor}}

[Service]
Type=simple
User={{user}}
ExecStart={{start_drumgizmo}}
Restart=on-failure
RestartSec=1
LimitRTPRIO={{rtprio}}
LimitMEMLOCK=infinity

[Install]
WantedBy=multi-user.target
"#,
);

pub const PLUMBING_SERVICE: Template = Template::new(
    "jack-plumbing.service",
    r#"[Unit]
Description=JACK auto-connect for the drum engine
After=jackd.service drumgizmo.service
Requires=jackd.service

[Service]
Type=simple
User={{user}}
ExecStart=/usr/bin/jack-plumbing -o {{rules}}
Restart=on-failure
RestartSec=1

[Install]
WantedBy=multi-user.target
"#,
);

pub const PLUMBING_RULES: Template = Template::new(
    "jack-plumbing",
    r#"; Generated by drumpi. Local changes are overwritten on the next provisioning run.
; MIDI from the drum module into DrumGizmo.
(connect "a2j:.*capture.*" "DrumGizmo:drumgizmo_midiin")
; DrumGizmo's left and right channels to the first two playback ports.
(connect "DrumGizmo:.*L$" "system:playback_1")
(connect "DrumGizmo:.*R$" "system:playback_2")
"#,
);
