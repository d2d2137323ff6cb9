#[cfg(test)]
mod coverage;
#[cfg(test)]
mod detect;
#[cfg(test)]
mod repair;
#[cfg(test)]
mod select;
#[cfg(test)]
mod verify;
