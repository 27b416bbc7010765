//! Prompt text and locally generated guidance.

use crate::{Persona, SessionConfig, Turn, PHASES};

pub const SAFETY_NOTE: &str = "Gentle reminder: pause or stop if any discomfort arises.";

pub const CERTIFICATE_TITLE: &str = "Om - Participation Certificate";

/// System instructions for phase guidance and chat replies.
pub fn system_prompt(config: &SessionConfig) -> String {
    format!(
        "You are a compassionate meditation teacher.\n\
         Persona: {name} - style: {style}\n\
         Intent: {intent}; mantra: \"{mantra}\".\n\
         {SAFETY_NOTE}\n\
         Keep replies brief (3-7 short sentences), invitational, sensory, kind. Avoid medical advice.\n\
         End with a gentle check-in question.",
        name = config.persona.name,
        style = config.persona.style,
        intent = config.intent.as_str(),
        mantra = config.mantra,
    )
}

/// User message asking the guide to open the given phase.
pub fn phase_prompt(phase: usize, mantra: &str) -> String {
    let phase = &PHASES[phase.min(PHASES.len() - 1)];
    format!(
        "Phase: {}\nGoals: {}\nUse the mantra \"{}\" naturally.\n\
         2-6 short sentences; warm tone; invite breath cues.\n",
        phase.title, phase.goals, mantra
    )
}

/// Fixed guidance for self-guided sessions.
pub fn self_guided_text(phase: usize, mantra: &str) -> String {
    match phase {
        0 => format!(
            "• Find a comfortable seat. Lengthen your spine, soften shoulders.\n\
             • Set intention for this session. Mantra: \"{mantra}\".\n\
             • Take 3 relaxed breaths, slow in, slower out.\n\
             • When ready, continue."
        ),
        1 => format!(
            "• Breathe in for 4, out for 6. Whisper your mantra: \"{mantra}\".\n\
             • Let distractions drift by; kindly return to breath and mantra.\n\
             • Continue for a minute or two, at your own pace."
        ),
        2 => format!(
            "• Gentle body scan: crown, forehead, jaw, shoulders, torso, hips, legs, feet.\n\
             • Wherever there is tension, soften slightly.\n\
             • Offer a kind wish to yourself with the mantra: \"{mantra}\"."
        ),
        _ => "• Deepen the breath. Notice calm and steadiness.\n\
              • Choose one small action to carry this feeling into your day.\n\
              • When ready, gently open the eyes. Thank yourself for practicing."
            .to_string(),
    }
}

/// System instructions for the personal note printed on the certificate.
pub fn certificate_system_prompt(label: &str, style: &str) -> String {
    format!(
        "You are {label}, a meditation guide. Style: {style}\n\
         Write a warm, encouraging ONE-PAGE note for the practitioner.\n\
         IMPORTANT: Minimum 180 words, target 220-260 words. Plain text only.\n\
         Reflect the actual session; use second person; weave in intent and mantra; \
         offer 2-3 gentle suggestions for the next day; avoid medical claims."
    )
}

pub fn certificate_user_prompt(intent: &str, mantra: &str, minutes: u32, turns: &[Turn]) -> String {
    format!(
        "Session metadata:\n- Intent: {intent}\n- Mantra: {mantra}\n- Duration: {minutes} minutes\n\n\
         Recent conversation (latest last):\n{}\n\nWrite the full note now.",
        flatten_turns(turns)
    )
}

/// Note used when the dialogue service cannot write one.
pub fn fallback_certificate_note(intent: &str, mantra: &str, label: &str) -> String {
    format!(
        "Dear friend,\n\n\
         Today you practiced with the intention of {intent}. Let your mantra, \"{mantra}\", \
         stay close as the day unfolds. When attention wanders, return kindly to breath. \
         Notice small places to soften the jaw and shoulders, and let the exhale be a touch longer.\n\n\
         Over the next day, try three simple things: pause for three soft breaths between tasks; \
         before sleep, scan the body from crown to feet; and after sitting, name one thing you appreciate. \
         Let these be gentle, low-effort invitations, not rules.\n\n\
         Thank you for showing up with courage. May your practice stay steady and kind.\n\n\
         With gratitude,\n{label}",
        intent = intent.to_lowercase(),
    )
}

/// One `role: content` line per turn, with line breaks inside a turn collapsed.
pub fn flatten_turns(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| {
            let content = t
                .content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            format!("{}: {}", t.role.as_str(), content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replace typographic punctuation with plain ASCII equivalents.
pub fn normalize_quotes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{2014}' | '\u{2013}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' => out.push(' '),
            _ => out.push(ch),
        }
    }
    out
}

/// Label printed on the certificate for a persona.
pub fn signature(persona: &Persona) -> &str {
    if persona.label.trim().is_empty() {
        "Your guide"
    } else {
        &persona.label
    }
}
