//! Pre-written phrases spoken without the text-generation service.

use rand::seq::SliceRandom;

use crate::types::Language;

const ENCOURAGEMENT_EN: &[&str] = &[
    "Perfect! You're on fire!",
    "Amazing moves, keep it up!",
    "You nailed that!",
    "Incredible rhythm!",
    "That's how it's done!",
];

const ENCOURAGEMENT_ES: &[&str] = &[
    "¡Perfecto! ¡Estás en llamas!",
    "¡Movimientos increíbles, sigue así!",
    "¡Lo clavaste!",
    "¡Qué ritmo tan increíble!",
    "¡Así se hace!",
];

const ENCOURAGEMENT_DE: &[&str] = &[
    "Perfekt! Du bist on fire!",
    "Tolle Bewegungen, weiter so!",
    "Das hast du super gemacht!",
    "Unglaublicher Rhythmus!",
    "Genau so geht das!",
];

const ENCOURAGEMENT_RU: &[&str] = &[
    "Идеально! Ты в ударе!",
    "Потрясающие движения, продолжай!",
    "Ты справился на отлично!",
    "Невероятный ритм!",
    "Вот это да!",
];

const FALLBACK_EN: &[&str] = &[
    "Keep those arms up higher!",
    "Great energy! Watch your timing.",
    "Follow the beat and stay loose!",
    "Bend your knees a little more!",
    "Match the dancer's moves, you've got this!",
];

const FALLBACK_ES: &[&str] = &[
    "¡Mantén los brazos más arriba!",
    "¡Gran energía! Cuida el ritmo.",
    "¡Sigue el compás y relájate!",
    "¡Dobla un poco más las rodillas!",
    "¡Imita al bailarín, tú puedes!",
];

const FALLBACK_DE: &[&str] = &[
    "Halte die Arme höher!",
    "Tolle Energie! Achte auf das Timing.",
    "Folge dem Beat und bleib locker!",
    "Beug die Knie etwas mehr!",
    "Mach die Bewegungen nach, du schaffst das!",
];

const FALLBACK_RU: &[&str] = &[
    "Держи руки выше!",
    "Отличная энергия! Следи за ритмом.",
    "Следуй за битом и расслабься!",
    "Сгибай колени чуть больше!",
    "Повторяй за танцором, у тебя получится!",
];

pub fn encouragement_phrases(language: Language) -> &'static [&'static str] {
    match language {
        Language::En => ENCOURAGEMENT_EN,
        Language::Es => ENCOURAGEMENT_ES,
        Language::De => ENCOURAGEMENT_DE,
        Language::Ru => ENCOURAGEMENT_RU,
    }
}

/// Generic tips used when the text-generation service answers with an error.
pub fn fallback_phrases(language: Language) -> &'static [&'static str] {
    match language {
        Language::En => FALLBACK_EN,
        Language::Es => FALLBACK_ES,
        Language::De => FALLBACK_DE,
        Language::Ru => FALLBACK_RU,
    }
}

pub fn random_phrase(phrases: &'static [&'static str]) -> Option<&'static str> {
    phrases.choose(&mut rand::thread_rng()).copied()
}
